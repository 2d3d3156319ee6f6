//! Emotion classification gateway.
//!
//! The endpoint takes `{"text": ...}` and answers
//! `{"emotion": ..., "probabilities": {...}}`. Any failure degrades to the
//! fixed neutral result in [`ClassifierOutcome::fallback`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{check_http_response, ProviderError};
use crate::entry::EmotionProbabilities;

/// Default classifier endpoint.
pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8000/predict/";

/// Label reported when classification is unavailable.
pub const FALLBACK_EMOTION: &str = "neutral";

/// Successful classifier response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Primary emotion label.
    pub emotion: String,
    /// Per-label probabilities.
    pub probabilities: EmotionProbabilities,
}

/// What callers of [`ClassifierGateway::classify`] receive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierOutcome {
    /// Primary emotion label.
    pub emotion: String,
    /// Per-label probabilities.
    pub probabilities: EmotionProbabilities,
    /// Whether this is the fixed fallback rather than a real classification.
    pub fallback: bool,
}

impl ClassifierOutcome {
    /// The fixed result used whenever the classifier cannot answer.
    pub fn fallback() -> Self {
        Self {
            emotion: FALLBACK_EMOTION.to_owned(),
            probabilities: EmotionProbabilities::FALLBACK,
            fallback: true,
        }
    }
}

/// Transport to a classification service.
#[async_trait]
pub trait ClassifierTransport: Send + Sync {
    /// Classify `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, status, or parse failure.
    async fn predict(&self, text: &str) -> Result<Classification, ProviderError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

/// HTTP classifier transport.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    /// Endpoint URL receiving the POST.
    #[doc(hidden)]
    pub endpoint: String,
    client: reqwest::Client,
}

impl HttpClassifier {
    /// Create a transport posting to `endpoint`.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

/// Parse a classifier response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body is not a classification.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<Classification, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
}

#[async_trait]
impl ClassifierTransport for HttpClassifier {
    async fn predict(&self, text: &str) -> Result<Classification, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { text })
            .send()
            .await?;
        let body = check_http_response(response).await?;
        parse_response(&body)
    }
}

/// Classification that never fails.
#[derive(Clone)]
pub struct ClassifierGateway {
    transport: Arc<dyn ClassifierTransport>,
}

impl std::fmt::Debug for ClassifierGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGateway").finish_non_exhaustive()
    }
}

impl ClassifierGateway {
    /// Wrap a transport.
    pub fn new(transport: Arc<dyn ClassifierTransport>) -> Self {
        Self { transport }
    }

    /// Gateway over the HTTP endpoint at `endpoint`.
    pub fn http(endpoint: String) -> Self {
        Self::new(Arc::new(HttpClassifier::new(endpoint)))
    }

    /// Classify `text`, substituting the fixed fallback on any failure.
    pub async fn classify(&self, text: &str) -> ClassifierOutcome {
        match self.transport.predict(text).await {
            Ok(classification) => {
                debug!(emotion = %classification.emotion, "text classified");
                ClassifierOutcome {
                    emotion: classification.emotion,
                    probabilities: classification.probabilities,
                    fallback: false,
                }
            }
            Err(err) => {
                warn!(error = %err, "emotion classification unavailable; using neutral fallback");
                ClassifierOutcome::fallback()
            }
        }
    }
}
