//! Store selection.
//!
//! [`choose_store`] is evaluated once per engine call from the injected
//! force mode and the freshly resolved principal. Nothing is cached between
//! calls.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::principal::Principal;
use crate::store::medium::LocalMedium;
use crate::store::{LocalError, FORCE_MODE_SLOT};

/// Explicit override of the store preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForceMode {
    /// Always try the remote store first.
    Database,
    /// Use local storage only.
    LocalStorage,
}

impl ForceMode {
    /// Slot value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::LocalStorage => "localStorage",
        }
    }

    /// Read the persisted mode. Unknown slot values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read.
    pub async fn load(medium: &dyn LocalMedium) -> Result<Option<Self>, LocalError> {
        let Some(raw) = medium.get_item(FORCE_MODE_SLOT).await? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(mode) => Ok(Some(mode)),
            Err(err) => {
                warn!(error = %err, "ignoring unknown force mode in local storage");
                Ok(None)
            }
        }
    }

    /// Persist `mode`, or clear the slot for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be written.
    pub async fn store(medium: &dyn LocalMedium, mode: Option<Self>) -> Result<(), LocalError> {
        match mode {
            Some(mode) => medium.set_item(FORCE_MODE_SLOT, mode.as_str()).await,
            None => medium.remove_item(FORCE_MODE_SLOT).await,
        }
    }
}

impl fmt::Display for ForceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised force mode string.
#[derive(Debug, thiserror::Error)]
#[error("unknown force mode {0:?}, expected \"database\" or \"localStorage\"")]
pub struct ParseForceModeError(String);

impl FromStr for ForceMode {
    type Err = ParseForceModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "database" => Ok(Self::Database),
            "localStorage" => Ok(Self::LocalStorage),
            other => Err(ParseForceModeError(other.to_owned())),
        }
    }
}

/// Which stores an operation may touch, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePlan {
    /// Local storage only. The remote store is never contacted.
    LocalOnly,
    /// Remote store first, local storage when the remote store is unavailable.
    RemoteThenLocal,
}

/// Pick the plan for one call.
///
/// A forced mode wins over the principal's preference; without one,
/// demo and anonymous principals stay local.
pub fn choose_store(force_mode: Option<ForceMode>, principal: &Principal) -> StorePlan {
    match force_mode {
        Some(ForceMode::LocalStorage) => StorePlan::LocalOnly,
        Some(ForceMode::Database) => StorePlan::RemoteThenLocal,
        None if principal.is_local_preferred() => StorePlan::LocalOnly,
        None => StorePlan::RemoteThenLocal,
    }
}
