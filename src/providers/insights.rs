//! Insight generation gateway.
//!
//! Given an entry's content, mood and classifier output, an insight service
//! returns two short texts: insights about the writer's state and
//! suggestions for what to do next. When the service fails (or none is
//! configured) the gateway answers with templated text that echoes the
//! emotion and mood.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{check_http_response, ProviderError};
use crate::entry::{EmotionProbabilities, JournalEntry};

/// Input sent to the insight service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRequest {
    /// Entry text.
    pub content: Option<String>,
    /// Classifier emotion.
    pub emotion: Option<String>,
    /// Classifier probabilities.
    pub emotion_probabilities: Option<EmotionProbabilities>,
    /// Self-reported mood.
    pub mood: String,
}

impl From<&JournalEntry> for InsightRequest {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            content: entry.content.clone(),
            emotion: entry.emotion.clone(),
            emotion_probabilities: entry.emotion_probabilities,
            mood: entry.mood.clone(),
        }
    }
}

/// Generated texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    /// Observations about the entry.
    pub insights: String,
    /// Actionable suggestions.
    pub suggestions: String,
}

/// What callers of [`InsightGateway::generate`] receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightOutcome {
    /// Observations about the entry.
    pub insights: String,
    /// Actionable suggestions.
    pub suggestions: String,
    /// Whether the texts are the templated fallback.
    pub fallback: bool,
}

impl InsightOutcome {
    /// Templated texts used when generation fails.
    pub fn fallback(emotion: &str, mood: &str) -> Self {
        Self {
            insights: format!(
                "Based on your journal entry expressing {emotion} emotions and {mood} mood, \
                 I can see you're processing your experiences thoughtfully. Your willingness \
                 to reflect through writing shows emotional awareness and a commitment to \
                 understanding your mental state."
            ),
            suggestions: "Consider continuing your journaling practice as it's a valuable tool \
                          for emotional processing. If you're experiencing difficult emotions, \
                          try mindfulness techniques, gentle physical activity, or reaching out \
                          to supportive friends or family. Remember that seeking professional \
                          support is always a healthy choice when needed."
                .to_owned(),
            fallback: true,
        }
    }
}

/// Transport to an insight service.
#[async_trait]
pub trait InsightTransport: Send + Sync {
    /// Generate insights for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, status, or parse failure.
    async fn generate(&self, request: &InsightRequest) -> Result<Insights, ProviderError>;
}

/// Transport posting the request JSON to an insight endpoint.
#[derive(Debug, Clone)]
pub struct HttpInsightTransport {
    /// Endpoint URL receiving the POST.
    #[doc(hidden)]
    pub endpoint: String,
    client: reqwest::Client,
}

impl HttpInsightTransport {
    /// Create a transport posting to `endpoint`.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl InsightTransport for HttpInsightTransport {
    async fn generate(&self, request: &InsightRequest) -> Result<Insights, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;
        let body = check_http_response(response).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Insight generation that never fails.
#[derive(Clone, Default)]
pub struct InsightGateway {
    transport: Option<Arc<dyn InsightTransport>>,
}

impl std::fmt::Debug for InsightGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightGateway")
            .field("configured", &self.transport.is_some())
            .finish()
    }
}

impl InsightGateway {
    /// Wrap a transport.
    pub fn new(transport: Arc<dyn InsightTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Gateway with no service; every call returns the fallback.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Generate insights, substituting the templated fallback on any failure.
    pub async fn generate(&self, request: &InsightRequest) -> InsightOutcome {
        let result = match &self.transport {
            Some(transport) => transport.generate(request).await,
            None => Err(ProviderError::Unavailable(
                "no insight service configured".to_owned(),
            )),
        };

        match result {
            Ok(generated) => {
                debug!("insights generated");
                InsightOutcome {
                    insights: generated.insights,
                    suggestions: generated.suggestions,
                    fallback: false,
                }
            }
            Err(err) => {
                warn!(error = %err, "insight generation unavailable; using templated fallback");
                InsightOutcome::fallback(
                    request.emotion.as_deref().unwrap_or("unknown"),
                    &request.mood,
                )
            }
        }
    }
}
