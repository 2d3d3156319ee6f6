//! Local adapter: the whole collection serialized into one slot.
//!
//! Order is structural. [`LocalStore::insert`] prepends, so the stored array
//! is newest-first without any sort; [`LocalStore::list`] returns it as is.
//! Every mutation is a read-modify-write of the full slot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use super::medium::LocalMedium;
use super::{LocalError, ENTRIES_SLOT};
use crate::entry::{EntryPatch, JournalEntry};

/// Prefix of ids minted by [`LocalStore::insert`]. Remote ids never carry it.
pub const LOCAL_ID_PREFIX: &str = "demo-";

/// CRUD over the serialized local collection.
#[derive(Clone)]
pub struct LocalStore {
    medium: Arc<dyn LocalMedium>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Create a store over `medium`.
    pub fn new(medium: Arc<dyn LocalMedium>) -> Self {
        Self { medium }
    }

    /// The medium this store writes to. Other slots (principal, force mode)
    /// live on the same medium.
    pub fn medium(&self) -> &Arc<dyn LocalMedium> {
        &self.medium
    }

    async fn load(&self) -> Result<Vec<JournalEntry>, LocalError> {
        match self.medium.get_item(ENTRIES_SLOT).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[JournalEntry]) -> Result<(), LocalError> {
        let raw = serde_json::to_string(entries)?;
        self.medium.set_item(ENTRIES_SLOT, &raw).await
    }

    /// Store `entry` under a fresh local id at the head of the collection.
    ///
    /// The id is derived from `now` (`demo-<unix millis>`), bumped past any
    /// id already in use.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read or written.
    pub async fn insert(
        &self,
        mut entry: JournalEntry,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, LocalError> {
        let mut entries = self.load().await?;

        let mut stamp = now.timestamp_millis();
        let mut id = format!("{LOCAL_ID_PREFIX}{stamp}");
        while entries.iter().any(|e| e.id == id) {
            stamp = stamp.saturating_add(1);
            id = format!("{LOCAL_ID_PREFIX}{stamp}");
        }

        entry.id = id;
        entry.created_at = now;
        entry.updated_at = now;
        entries.insert(0, entry.clone());
        self.save(&entries).await?;
        trace!(id = %entry.id, "local entry inserted");
        Ok(entry)
    }

    /// Entries in stored order, truncated to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<JournalEntry>, LocalError> {
        let mut entries = self.load().await?;
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries.into_iter().map(JournalEntry::normalize).collect())
    }

    /// Find an entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::NotFound`] if no entry has the id.
    pub async fn get(&self, id: &str) -> Result<JournalEntry, LocalError> {
        self.load()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .map(JournalEntry::normalize)
            .ok_or_else(|| LocalError::NotFound(id.to_owned()))
    }

    /// Apply `patch` to the entry with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::NotFound`] if no entry has the id.
    pub async fn update(
        &self,
        id: &str,
        patch: &EntryPatch,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, LocalError> {
        let mut entries = self.load().await?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| LocalError::NotFound(id.to_owned()))?;
        entry.apply(patch, now);
        let updated = entry.clone();
        self.save(&entries).await?;
        trace!(id, "local entry updated");
        Ok(updated.normalize())
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read or written.
    pub async fn delete(&self, id: &str) -> Result<bool, LocalError> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries).await?;
        trace!(id, "local entry deleted");
        Ok(true)
    }

    /// Overwrite the whole collection with `entries`, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be written.
    pub async fn replace_all(&self, entries: &[JournalEntry]) -> Result<(), LocalError> {
        self.save(entries).await
    }

    /// Overwrite the collection with `remote`, keeping entries that only
    /// exist locally.
    ///
    /// An entry is local-only when its id was minted here and `remote` has
    /// no row with that id. The result is ordered by `date`, newest first.
    /// Returns how many local-only entries were kept.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read or written.
    pub async fn mirror(&self, remote: &[JournalEntry]) -> Result<usize, LocalError> {
        let mut merged: Vec<JournalEntry> = self
            .load()
            .await?
            .into_iter()
            .filter(|e| {
                e.id.starts_with(LOCAL_ID_PREFIX) && !remote.iter().any(|r| r.id == e.id)
            })
            .collect();
        let kept = merged.len();
        merged.extend_from_slice(remote);
        merged.sort_by(|a, b| b.date.cmp(&a.date));
        self.save(&merged).await?;
        trace!(count = merged.len(), kept, "local collection mirrored");
        Ok(kept)
    }

    /// Whether the collection slot has ever been written.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be read.
    pub async fn is_initialized(&self) -> Result<bool, LocalError> {
        Ok(self.medium.get_item(ENTRIES_SLOT).await?.is_some())
    }

    /// Drop the collection slot.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the slot cannot be removed.
    pub async fn clear(&self) -> Result<(), LocalError> {
        self.medium.remove_item(ENTRIES_SLOT).await
    }
}
