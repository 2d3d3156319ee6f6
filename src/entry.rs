//! Journal entry data model.
//!
//! [`JournalEntry`] is the one persisted entity. It is stored verbatim in the
//! local collection and mirrors the remote `entries` table column for column.
//! Which store served a record is not part of the record: engine operations
//! wrap their results in [`Served`] instead.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of characters kept in an excerpt before the ellipsis.
pub const EXCERPT_CHARS: usize = 150;

// ---------------------------------------------------------------------------
// Emotion probabilities
// ---------------------------------------------------------------------------

/// Classifier output over the fixed six-label emotion set.
///
/// Values are taken as reported; they are not normalized and need not sum
/// to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionProbabilities {
    /// Anger.
    pub anger: f64,
    /// Disgust.
    pub disgust: f64,
    /// Fear.
    pub fear: f64,
    /// Joy.
    pub joy: f64,
    /// Neutral.
    pub neutral: f64,
    /// Sadness.
    pub sadness: f64,
}

impl EmotionProbabilities {
    /// The vector reported when classification is unavailable.
    pub const FALLBACK: Self = Self {
        anger: 0.16,
        disgust: 0.16,
        fear: 0.16,
        joy: 0.16,
        neutral: 0.20,
        sadness: 0.16,
    };
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Opaque identifier. Local ids are timestamp-derived, remote ids are
    /// server-generated.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Full text. May be absent when only an excerpt was kept.
    #[serde(default)]
    pub content: Option<String>,
    /// Derived preview of `content`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub excerpt: String,
    /// User-supplied mood label.
    pub mood: String,
    /// Free-form tags in insertion order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Calendar date of authorship.
    pub date: NaiveDate,
    /// Primary emotion reported by the classifier.
    #[serde(default)]
    pub emotion: Option<String>,
    /// Per-label classifier probabilities.
    #[serde(default)]
    pub emotion_probabilities: Option<EmotionProbabilities>,
    /// Generated insight text.
    #[serde(default)]
    pub ai_insights: Option<String>,
    /// Generated suggestion text.
    #[serde(default)]
    pub ai_suggestions: Option<String>,
    /// Owner reference. `None` means public/unscoped.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Restore the derived-field invariants on a record read from a store.
    ///
    /// A missing excerpt is rebuilt from `content`, and `updated_at` is
    /// clamped so it never precedes `created_at`.
    pub fn normalize(mut self) -> Self {
        if self.excerpt.is_empty() {
            if let Some(content) = &self.content {
                self.excerpt = excerpt(content);
            }
        }
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
        self
    }

    /// Apply a patch in place and stamp `updated_at`.
    pub fn apply(&mut self, patch: &EntryPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.excerpt = excerpt(content);
            self.content = Some(content.clone());
        }
        if let Some(mood) = &patch.mood {
            self.mood.clone_from(mood);
        }
        if let Some(tags) = &patch.tags {
            self.tags.clone_from(tags);
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(emotion) = &patch.emotion {
            self.emotion = Some(emotion.clone());
        }
        if let Some(probabilities) = patch.emotion_probabilities {
            self.emotion_probabilities = Some(probabilities);
        }
        if let Some(insights) = &patch.ai_insights {
            self.ai_insights = Some(insights.clone());
        }
        if let Some(suggestions) = &patch.ai_suggestions {
            self.ai_suggestions = Some(suggestions.clone());
        }
        self.updated_at = now.max(self.created_at);
    }
}

/// Derive an excerpt: the first 150 characters plus `"..."` when truncated.
pub fn excerpt(content: &str) -> String {
    if content.chars().count() > EXCERPT_CHARS {
        let head: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_owned()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Row stores return every column, so an unset value arrives as `null`
/// rather than as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// User input for a new entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewEntry {
    /// Entry title.
    pub title: String,
    /// Entry text.
    pub content: String,
    /// Mood label.
    pub mood: String,
    /// Tags, kept in the given order.
    pub tags: Vec<String>,
    /// Authorship date. Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

/// Partial update to an entry. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EntryPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New content; the excerpt is re-derived from it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New mood label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// New authorship date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// New primary emotion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// New emotion probabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_probabilities: Option<EmotionProbabilities>,
    /// Generated insights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<String>,
    /// Generated suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<String>,
}

impl EntryPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which store served or accepted an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Served by the remote store.
    #[serde(rename = "database")]
    Database,
    /// Served by local storage because local storage was the chosen store.
    #[serde(rename = "localStorage")]
    LocalStorage,
    /// Served by local storage after the remote store failed.
    #[serde(rename = "localStorage-fallback")]
    LocalStorageFallback,
    /// Served by the remote store and mirrored into local storage.
    #[serde(rename = "database-synced")]
    DatabaseSynced,
}

impl Source {
    /// Wire name of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::LocalStorage => "localStorage",
            Self::LocalStorageFallback => "localStorage-fallback",
            Self::DatabaseSynced => "database-synced",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation result tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Served<T> {
    /// The result payload.
    pub data: T,
    /// Store that produced it.
    pub source: Source,
}

impl<T> Served<T> {
    /// Tag a payload.
    pub fn new(data: T, source: Source) -> Self {
        Self { data, source }
    }
}
