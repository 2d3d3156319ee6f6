//! Remote adapter over a PostgREST (Supabase-style) row store.
//!
//! Rows live in `{base_url}/rest/v1/{table}`. Filters use PostgREST query
//! syntax (`user_id=eq.<owner>`, `date=gte.<day>`, `order=date.desc`).
//! The owner filter is left out of the query string entirely when the caller
//! has no owner reference, which is how anonymous sessions see the whole
//! table.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use super::{ListQuery, RemoteError, RemoteStore};
use crate::entry::{EmotionProbabilities, EntryPatch, JournalEntry};
use crate::providers::{check_http_response, ProviderError};

/// Default table holding journal rows.
pub const DEFAULT_TABLE: &str = "entries";

impl From<ProviderError> for RemoteError {
    fn from(err: ProviderError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Insert payload. Id and audit timestamps are left to server defaults.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct InsertRow<'a> {
    /// Title.
    pub title: &'a str,
    /// Content.
    pub content: Option<&'a str>,
    /// Excerpt.
    pub excerpt: &'a str,
    /// Mood.
    pub mood: &'a str,
    /// Tags.
    pub tags: &'a [String],
    /// Authorship date.
    pub date: NaiveDate,
    /// Primary emotion.
    pub emotion: Option<&'a str>,
    /// Emotion probabilities.
    pub emotion_probabilities: Option<EmotionProbabilities>,
    /// Insights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<&'a str>,
    /// Suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<&'a str>,
    /// Owner reference.
    pub user_id: Option<&'a str>,
}

impl<'a> From<&'a JournalEntry> for InsertRow<'a> {
    fn from(entry: &'a JournalEntry) -> Self {
        Self {
            title: &entry.title,
            content: entry.content.as_deref(),
            excerpt: &entry.excerpt,
            mood: &entry.mood,
            tags: &entry.tags,
            date: entry.date,
            emotion: entry.emotion.as_deref(),
            emotion_probabilities: entry.emotion_probabilities,
            ai_insights: entry.ai_insights.as_deref(),
            ai_suggestions: entry.ai_suggestions.as_deref(),
            user_id: entry.user_id.as_deref(),
        }
    }
}

/// Update payload: the patch fields plus derived columns.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct UpdateRow<'a> {
    /// Fields being changed.
    #[serde(flatten)]
    pub patch: &'a EntryPatch,
    /// Re-derived excerpt when content changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Build the query pairs for a list read.
#[doc(hidden)]
pub fn build_query(owner: Option<&str>, query: ListQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_owned(), "*".to_owned())];
    if let Some(owner) = owner {
        pairs.push(("user_id".to_owned(), format!("eq.{owner}")));
    }
    if let Some(range) = query.range {
        pairs.push(("date".to_owned(), format!("gte.{}", range.start)));
        pairs.push(("date".to_owned(), format!("lte.{}", range.end)));
    }
    pairs.push(("order".to_owned(), "date.desc".to_owned()));
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_owned(), limit.to_string()));
    }
    pairs
}

/// Build the query pairs addressing a single row.
#[doc(hidden)]
pub fn build_row_filter(id: &str, owner: Option<&str>) -> Vec<(String, String)> {
    let mut pairs = vec![("id".to_owned(), format!("eq.{id}"))];
    if let Some(owner) = owner {
        pairs.push(("user_id".to_owned(), format!("eq.{owner}")));
    }
    pairs
}

/// Decode a PostgREST array response.
///
/// # Errors
///
/// Returns [`RemoteError::Unavailable`] if the body is not an array of rows.
#[doc(hidden)]
pub fn parse_rows(body: &str) -> Result<Vec<JournalEntry>, RemoteError> {
    let rows: Vec<JournalEntry> = serde_json::from_str(body)
        .map_err(|e| RemoteError::Unavailable(format!("unexpected row payload: {e}")))?;
    Ok(rows.into_iter().map(JournalEntry::normalize).collect())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Connection settings for [`PostgrestStore`].
#[derive(Clone)]
pub struct PostgrestConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`. `None` leaves the
    /// store unconfigured and every call fails as unavailable.
    pub base_url: Option<String>,
    /// API key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Table name.
    pub table: String,
}

impl std::fmt::Debug for PostgrestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("table", &self.table)
            .finish()
    }
}

/// [`RemoteStore`] backed by the PostgREST HTTP API.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    config: PostgrestConfig,
    client: reqwest::Client,
}

impl PostgrestStore {
    /// Create a store for the given settings.
    pub fn new(config: PostgrestConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> Result<Url, RemoteError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| RemoteError::Unavailable("remote store not configured".to_owned()))?;
        let base = Url::parse(base)
            .map_err(|e| RemoteError::Unavailable(format!("invalid remote url {base:?}: {e}")))?;
        base.join(&format!("rest/v1/{}", self.config.table))
            .map_err(|e| RemoteError::Unavailable(format!("invalid table path: {e}")))
    }

    fn request(&self, method: reqwest::Method) -> Result<reqwest::RequestBuilder, RemoteError> {
        let url = self.table_url()?;
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        Ok(builder)
    }

    async fn fetch_rows(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<Vec<JournalEntry>, RemoteError> {
        let response = builder.send().await?;
        let body = check_http_response(response).await?;
        parse_rows(&body)
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    async fn insert(&self, entry: &JournalEntry) -> Result<JournalEntry, RemoteError> {
        let request = self
            .request(reqwest::Method::POST)?
            .header("Prefer", "return=representation")
            .json(&[InsertRow::from(entry)]);
        let mut rows = self.fetch_rows(request).await?;
        if rows.is_empty() {
            return Err(RemoteError::Unavailable(
                "insert returned no representation".to_owned(),
            ));
        }
        let stored = rows.swap_remove(0);
        debug!(id = %stored.id, "remote entry inserted");
        Ok(stored)
    }

    async fn list(
        &self,
        owner: Option<&str>,
        query: ListQuery,
    ) -> Result<Vec<JournalEntry>, RemoteError> {
        let request = self
            .request(reqwest::Method::GET)?
            .query(&build_query(owner, query));
        let rows = self.fetch_rows(request).await?;
        trace!(count = rows.len(), scoped = owner.is_some(), "remote entries listed");
        Ok(rows)
    }

    async fn get(&self, id: &str, owner: Option<&str>) -> Result<JournalEntry, RemoteError> {
        let mut filter = build_row_filter(id, owner);
        filter.push(("select".to_owned(), "*".to_owned()));
        let request = self.request(reqwest::Method::GET)?.query(&filter);
        self.fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))
    }

    async fn update(
        &self,
        id: &str,
        patch: &EntryPatch,
        owner: Option<&str>,
    ) -> Result<JournalEntry, RemoteError> {
        let body = UpdateRow {
            patch,
            excerpt: patch.content.as_deref().map(crate::entry::excerpt),
            updated_at: Utc::now(),
        };
        let request = self
            .request(reqwest::Method::PATCH)?
            .query(&build_row_filter(id, owner))
            .header("Prefer", "return=representation")
            .json(&body);
        let updated = self
            .fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))?;
        debug!(id, "remote entry updated");
        Ok(updated)
    }

    async fn delete(&self, id: &str, owner: Option<&str>) -> Result<(), RemoteError> {
        let request = self
            .request(reqwest::Method::DELETE)?
            .query(&build_row_filter(id, owner));
        let response = request.send().await?;
        check_http_response(response).await?;
        debug!(id, "remote entry deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        let request = self
            .request(reqwest::Method::GET)?
            .query(&[("select", "id"), ("limit", "1")]);
        let response = request.send().await?;
        check_http_response(response).await?;
        Ok(())
    }
}
