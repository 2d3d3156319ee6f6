//! Insight gateway fallback behavior.

use std::sync::Arc;

use async_trait::async_trait;

use moodjournal::providers::insights::{
    InsightGateway, InsightOutcome, InsightRequest, InsightTransport, Insights,
};
use moodjournal::providers::ProviderError;

struct Timeout;

#[async_trait]
impl InsightTransport for Timeout {
    async fn generate(&self, _request: &InsightRequest) -> Result<Insights, ProviderError> {
        Err(ProviderError::Unavailable("timed out".to_owned()))
    }
}

fn request(emotion: Option<&str>) -> InsightRequest {
    InsightRequest {
        content: Some("Long day at work.".to_owned()),
        emotion: emotion.map(str::to_owned),
        emotion_probabilities: None,
        mood: "tired".to_owned(),
    }
}

#[tokio::test]
async fn transport_failure_uses_template_naming_emotion_and_mood() {
    let gateway = InsightGateway::new(Arc::new(Timeout));

    let outcome = gateway.generate(&request(Some("sadness"))).await;

    assert!(outcome.fallback);
    assert!(outcome
        .insights
        .contains("expressing sadness emotions and tired mood"));
    assert!(outcome.suggestions.starts_with("Consider continuing your journaling"));
}

#[tokio::test]
async fn unconfigured_gateway_falls_back_with_unknown_emotion() {
    let outcome = InsightGateway::disabled().generate(&request(None)).await;

    assert_eq!(outcome, InsightOutcome::fallback("unknown", "tired"));
}
