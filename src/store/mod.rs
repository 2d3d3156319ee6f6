//! Backing stores for journal entries.
//!
//! Two adapters sit behind the sync engine:
//! - [`RemoteStore`]: the hosted row store, implemented over PostgREST by
//!   [`remote::PostgrestStore`]
//! - [`local::LocalStore`]: one serialized collection in a string-keyed
//!   [`medium::LocalMedium`] slot
//!
//! Neither adapter knows about the other; reconciliation lives in
//! [`crate::sync`].

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::entry::{EntryPatch, JournalEntry};

pub mod demo;
pub mod local;
pub mod medium;
pub mod remote;

/// Slot holding the JSON array of local entries.
pub const ENTRIES_SLOT: &str = "demo-entries";
/// Slot holding the active demo principal.
pub const DEMO_USER_SLOT: &str = "demo-user";
/// Slot holding the forced store preference.
pub const FORCE_MODE_SLOT: &str = "journal-force-mode";

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First date included.
    pub start: NaiveDate,
    /// Last date included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Parameters of a list read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum number of entries returned.
    pub limit: Option<usize>,
    /// Restrict to entries dated inside this range.
    pub range: Option<DateRange>,
}

impl ListQuery {
    /// Whether the query asks for the whole collection.
    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.range.is_none()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the remote row store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Network, HTTP, configuration, or decoding failure.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    /// No row matched the id (and owner, when scoped).
    #[error("entry {0} not found in remote store")]
    NotFound(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Errors from local storage.
#[derive(Debug, thiserror::Error)]
pub enum LocalError {
    /// The storage medium cannot be read or written.
    #[error("local storage medium unavailable: {0}")]
    MediumUnavailable(String),
    /// No local record has the id.
    #[error("entry {0} not found in local storage")]
    NotFound(String),
}

impl From<sqlx::Error> for LocalError {
    fn from(err: sqlx::Error) -> Self {
        Self::MediumUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for LocalError {
    fn from(err: serde_json::Error) -> Self {
        Self::MediumUnavailable(format!("corrupt local slot: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Remote trait
// ---------------------------------------------------------------------------

/// CRUD over the hosted row store.
///
/// Every `owner` argument is a scoping filter: `Some` restricts the
/// operation to that owner's rows, `None` omits the filter entirely so the
/// call sees the full unscoped table.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a record; the store assigns the id and audit timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unavailable`] on any transport or server failure.
    async fn insert(&self, entry: &JournalEntry) -> Result<JournalEntry, RemoteError>;

    /// List records, newest `date` first.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unavailable`] on any transport or server failure.
    async fn list(
        &self,
        owner: Option<&str>,
        query: ListQuery,
    ) -> Result<Vec<JournalEntry>, RemoteError>;

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] when no row matches.
    async fn get(&self, id: &str, owner: Option<&str>) -> Result<JournalEntry, RemoteError>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] when no row matches.
    async fn update(
        &self,
        id: &str,
        patch: &EntryPatch,
        owner: Option<&str>,
    ) -> Result<JournalEntry, RemoteError>;

    /// Delete a record. Deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unavailable`] on any transport or server failure.
    async fn delete(&self, id: &str, owner: Option<&str>) -> Result<(), RemoteError>;

    /// Cheap reachability check.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unavailable`] if the store cannot be queried.
    async fn ping(&self) -> Result<(), RemoteError>;
}
