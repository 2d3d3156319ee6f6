//! String-keyed storage slots for on-device persistence.
//!
//! A [`LocalMedium`] behaves like browser `localStorage`: each slot holds one
//! string, and every write replaces the whole slot. Two media are provided:
//! [`SqliteMedium`] for the CLI and [`MemoryMedium`] for tests and
//! throwaway sessions.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::debug;

use super::LocalError;

/// A string-keyed slot store.
#[async_trait]
pub trait LocalMedium: Send + Sync {
    /// Read a slot. `None` when the slot was never written.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the medium cannot be read.
    async fn get_item(&self, key: &str) -> Result<Option<String>, LocalError>;

    /// Overwrite a slot.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the medium cannot be written.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError>;

    /// Remove a slot. Removing an absent slot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the medium cannot be written.
    async fn remove_item(&self, key: &str) -> Result<(), LocalError>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// Slots persisted in a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteMedium {
    pool: SqlitePool,
}

impl SqliteMedium {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the file cannot be
    /// created or the schema cannot be applied.
    pub async fn open(path: &Path) -> Result<Self, LocalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LocalError::MediumUnavailable(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::MediumUnavailable`] if the schema cannot be applied.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, LocalError> {
        let schema = include_str!("../../migrations/001_local_storage.sql");
        sqlx::raw_sql(schema).execute(&pool).await?;
        debug!("local storage schema applied");
        Ok(Self { pool })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LocalMedium for SqliteMedium {
    async fn get_item(&self, key: &str) -> Result<Option<String>, LocalError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_storage WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError> {
        sqlx::query(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), LocalError> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Slots held in process memory.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    slots: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryMedium {
    /// Empty medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium whose every access fails, standing in for a storage backend
    /// that has gone away.
    pub fn unavailable() -> Self {
        Self {
            slots: Mutex::default(),
            unavailable: true,
        }
    }

    fn check(&self) -> Result<(), LocalError> {
        if self.unavailable {
            return Err(LocalError::MediumUnavailable(
                "in-memory medium disabled".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalMedium for MemoryMedium {
    async fn get_item(&self, key: &str) -> Result<Option<String>, LocalError> {
        self.check()?;
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError> {
        self.check()?;
        self.slots
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), LocalError> {
        self.check()?;
        self.slots.lock().await.remove(key);
        Ok(())
    }
}
