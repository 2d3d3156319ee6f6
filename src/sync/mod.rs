//! Synchronization and fallback engine.
//!
//! [`JournalEngine`] is the only entry point callers use for entries. Each
//! call runs the same sequence:
//!
//! ```text
//! resolve principal → choose store → attempt primary → (done | attempt local) → done
//! ```
//!
//! Write rules:
//! - create/update: any remote failure is recovered by performing the same
//!   write locally, tagged [`Source::LocalStorageFallback`];
//! - delete: remote failures propagate, nothing is deleted locally.
//!
//! Read rule: remote first; on any remote failure read local storage, tagged
//! [`Source::LocalStorageFallback`]. A miss in both stores is
//! [`JournalError::NotFound`]. Unbounded list reads that succeed
//! remotely are mirrored over the local collection and tagged
//! [`Source::DatabaseSynced`] when the mirror write lands. The mirror keeps
//! entries that were only ever written locally, so a fallback write
//! survives the next read. [`JournalEngine::sync_remote_to_local`] is the
//! only full overwrite.
//!
//! Every fallback is logged at `warn` and counted by
//! [`JournalEngine::fallback_count`].

pub mod policy;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use self::policy::{choose_store, ForceMode, StorePlan};
use crate::entry::{excerpt, EntryPatch, JournalEntry, NewEntry, Served, Source};
use crate::principal::{Principal, PrincipalResolver};
use crate::providers::classifier::ClassifierGateway;
use crate::providers::insights::{InsightGateway, InsightOutcome, InsightRequest};
use crate::store::local::LocalStore;
use crate::store::{ListQuery, LocalError, RemoteError, RemoteStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Terminal errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// No principal could be resolved. Not produced while the anonymous
    /// principal is available.
    #[error("not authenticated")]
    NotAuthenticated,
    /// The remote store failed on a path with no local recovery.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
    /// The id does not exist in the store that served the call.
    #[error("entry {0} not found")]
    NotFound(String),
    /// Local storage is inaccessible. Never retried.
    #[error("local storage medium unavailable: {0}")]
    StorageMediumUnavailable(String),
}

impl From<RemoteError> for JournalError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => Self::RemoteUnavailable(msg),
            RemoteError::NotFound(id) => Self::NotFound(id),
        }
    }
}

impl From<LocalError> for JournalError {
    fn from(err: LocalError) -> Self {
        match err {
            LocalError::MediumUnavailable(msg) => Self::StorageMediumUnavailable(msg),
            LocalError::NotFound(id) => Self::NotFound(id),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Per-engine context replacing ambient session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Forced store preference, if any.
    pub force_mode: Option<ForceMode>,
    /// Mirror unbounded remote list reads into local storage.
    pub mirror_full_reads: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            force_mode: None,
            mirror_full_reads: true,
        }
    }
}

/// Orchestrates reads and writes across the remote and local stores.
pub struct JournalEngine {
    remote: Arc<dyn RemoteStore>,
    local: LocalStore,
    principals: PrincipalResolver,
    classifier: ClassifierGateway,
    insights: InsightGateway,
    options: EngineOptions,
    fallbacks: AtomicU64,
}

impl std::fmt::Debug for JournalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalEngine")
            .field("options", &self.options)
            .field("fallbacks", &self.fallback_count())
            .finish_non_exhaustive()
    }
}

impl JournalEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: LocalStore,
        principals: PrincipalResolver,
        classifier: ClassifierGateway,
        insights: InsightGateway,
        options: EngineOptions,
    ) -> Self {
        Self {
            remote,
            local,
            principals,
            classifier,
            insights,
            options,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// The injected options.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Number of remote-to-local fallbacks taken so far.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Resolve the acting principal.
    pub async fn principal(&self) -> Principal {
        self.principals.resolve().await
    }

    async fn plan(&self) -> (Principal, StorePlan) {
        let principal = self.principals.resolve().await;
        let plan = choose_store(self.options.force_mode, &principal);
        debug!(kind = ?principal.kind, ?plan, "store chosen");
        (principal, plan)
    }

    fn record_fallback(&self, op: &'static str, err: &RemoteError) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        warn!(op, error = %err, "remote store failed; falling back to local storage");
    }

    // -- writes -------------------------------------------------------------

    /// Create an entry.
    ///
    /// The content is classified first (never fails), then the record is
    /// written to the chosen store.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::StorageMediumUnavailable`] if the local write
    /// is needed and fails.
    pub async fn create(&self, new: NewEntry) -> Result<Served<JournalEntry>, JournalError> {
        let (principal, plan) = self.plan().await;
        let classification = self.classifier.classify(&new.content).await;
        let now = Utc::now();

        let entry = JournalEntry {
            id: String::new(),
            title: new.title,
            excerpt: excerpt(&new.content),
            content: Some(new.content),
            mood: new.mood,
            tags: new.tags,
            date: new.date.unwrap_or_else(|| now.date_naive()),
            emotion: Some(classification.emotion),
            emotion_probabilities: Some(classification.probabilities),
            ai_insights: None,
            ai_suggestions: None,
            user_id: principal.owner().map(str::to_owned),
            created_at: now,
            updated_at: now,
        };

        if plan == StorePlan::LocalOnly {
            let stored = self.local.insert(entry, now).await?;
            info!(id = %stored.id, source = %Source::LocalStorage, "entry created");
            return Ok(Served::new(stored, Source::LocalStorage));
        }

        match self.remote.insert(&entry).await {
            Ok(stored) => {
                let stored = stored.normalize();
                info!(id = %stored.id, source = %Source::Database, "entry created");
                Ok(Served::new(stored, Source::Database))
            }
            Err(err) => {
                self.record_fallback("create", &err);
                let stored = self.local.insert(entry, now).await?;
                info!(id = %stored.id, source = %Source::LocalStorageFallback, "entry created");
                Ok(Served::new(stored, Source::LocalStorageFallback))
            }
        }
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`] if no store that was consulted has
    /// the id.
    pub async fn update(
        &self,
        id: &str,
        patch: EntryPatch,
    ) -> Result<Served<JournalEntry>, JournalError> {
        let (principal, plan) = self.plan().await;
        let now = Utc::now();

        if plan == StorePlan::LocalOnly {
            let updated = self.local.update(id, &patch, now).await?;
            debug!(id, source = %Source::LocalStorage, "entry updated");
            return Ok(Served::new(updated, Source::LocalStorage));
        }

        match self.remote.update(id, &patch, principal.owner()).await {
            Ok(updated) => {
                debug!(id, source = %Source::Database, "entry updated");
                Ok(Served::new(updated.normalize(), Source::Database))
            }
            Err(err) => {
                self.record_fallback("update", &err);
                let updated = self.local.update(id, &patch, now).await?;
                debug!(id, source = %Source::LocalStorageFallback, "entry updated");
                Ok(Served::new(updated, Source::LocalStorageFallback))
            }
        }
    }

    /// Delete an entry.
    ///
    /// Remote failures are returned as is and nothing is deleted locally.
    /// After a successful remote delete the id is also dropped from the
    /// local mirror.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::RemoteUnavailable`] when the remote delete fails.
    pub async fn delete(&self, id: &str) -> Result<Served<()>, JournalError> {
        let (principal, plan) = self.plan().await;

        if plan == StorePlan::LocalOnly {
            self.local.delete(id).await?;
            info!(id, source = %Source::LocalStorage, "entry deleted");
            return Ok(Served::new((), Source::LocalStorage));
        }

        self.remote.delete(id, principal.owner()).await?;
        if let Err(err) = self.local.delete(id).await {
            warn!(id, error = %err, "remote delete succeeded but local mirror was not updated");
        }
        info!(id, source = %Source::Database, "entry deleted");
        Ok(Served::new((), Source::Database))
    }

    // -- reads --------------------------------------------------------------

    async fn list_local(&self, query: ListQuery) -> Result<Vec<JournalEntry>, LocalError> {
        let Some(range) = query.range else {
            return self.local.list(query.limit).await;
        };
        let mut entries: Vec<JournalEntry> = self
            .local
            .list(None)
            .await?
            .into_iter()
            .filter(|e| range.contains(e.date))
            .collect();
        if let Some(limit) = query.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// List entries.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::StorageMediumUnavailable`] when local storage
    /// is needed and fails.
    pub async fn list(&self, query: ListQuery) -> Result<Served<Vec<JournalEntry>>, JournalError> {
        let (principal, plan) = self.plan().await;

        if plan == StorePlan::LocalOnly {
            let entries = self.list_local(query).await?;
            return Ok(Served::new(entries, Source::LocalStorage));
        }

        match self.remote.list(principal.owner(), query).await {
            Ok(entries) => {
                if !(self.options.mirror_full_reads && query.is_unbounded()) {
                    return Ok(Served::new(entries, Source::Database));
                }
                match self.local.mirror(&entries).await {
                    Ok(kept) => {
                        debug!(count = entries.len(), kept, "remote entries mirrored locally");
                        Ok(Served::new(entries, Source::DatabaseSynced))
                    }
                    Err(err) => {
                        warn!(error = %err, "could not mirror remote entries locally");
                        Ok(Served::new(entries, Source::Database))
                    }
                }
            }
            Err(err) => {
                self.record_fallback("list", &err);
                let entries = self.list_local(query).await?;
                Ok(Served::new(entries, Source::LocalStorageFallback))
            }
        }
    }

    /// Fetch one entry.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`] if no store that was consulted has
    /// the id.
    pub async fn get(&self, id: &str) -> Result<Served<JournalEntry>, JournalError> {
        let (principal, plan) = self.plan().await;

        if plan == StorePlan::LocalOnly {
            let entry = self.local.get(id).await?;
            return Ok(Served::new(entry, Source::LocalStorage));
        }

        match self.remote.get(id, principal.owner()).await {
            Ok(entry) => Ok(Served::new(entry.normalize(), Source::Database)),
            Err(err) => {
                self.record_fallback("get", &err);
                let entry = self.local.get(id).await?;
                Ok(Served::new(entry, Source::LocalStorageFallback))
            }
        }
    }

    // -- composite ----------------------------------------------------------

    /// Generate insights for an entry and store them on it.
    ///
    /// Reads the entry, asks the insight gateway (which never fails), then
    /// writes `ai_insights` and `ai_suggestions` through [`Self::update`].
    /// The returned source is that of the update.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`] if the entry does not exist.
    pub async fn generate_insights(
        &self,
        id: &str,
    ) -> Result<Served<InsightOutcome>, JournalError> {
        let entry = self.get(id).await?.data;
        let outcome = self.insights.generate(&InsightRequest::from(&entry)).await;

        let patch = EntryPatch {
            ai_insights: Some(outcome.insights.clone()),
            ai_suggestions: Some(outcome.suggestions.clone()),
            ..EntryPatch::default()
        };
        let updated = self.update(id, patch).await?;
        Ok(Served::new(outcome, updated.source))
    }

    /// Replace the local collection with the full remote collection.
    ///
    /// Destructive: entries that exist only locally are lost. Skipped (and
    /// reported as `false`) when the call would be local-only anyway, since
    /// local storage is then the only copy.
    pub async fn sync_remote_to_local(&self) -> bool {
        let (principal, plan) = self.plan().await;
        if plan == StorePlan::LocalOnly {
            info!("sync skipped: local storage is the active store");
            return false;
        }

        let entries = match self.remote.list(principal.owner(), ListQuery::default()).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "sync failed: remote store unavailable");
                return false;
            }
        };

        match self.local.replace_all(&entries).await {
            Ok(()) => {
                info!(count = entries.len(), "local storage synced from remote");
                true
            }
            Err(err) => {
                warn!(error = %err, "sync failed: local storage unavailable");
                false
            }
        }
    }
}
