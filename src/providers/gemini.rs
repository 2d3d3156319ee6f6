//! Gemini `generateContent` transport for insight generation.
//!
//! The model is prompted to answer in two labelled sections,
//! `INSIGHTS:` and `SUGGESTIONS:`, which [`parse_response`] splits apart.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::insights::{InsightRequest, InsightTransport, Insights};
use super::{check_http_response, ProviderError};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

const DEFAULT_INSIGHTS: &str = "Unable to generate insights at this time.";
const DEFAULT_SUGGESTIONS: &str = "Continue journaling regularly to track your emotional \
                                   patterns and consider speaking with a mental health \
                                   professional if you need additional support.";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Prompt contents.
    pub contents: Vec<GeminiContent>,
    /// Sampling settings.
    pub generation_config: GenerationConfig,
    /// Safety thresholds.
    pub safety_settings: Vec<SafetySetting>,
}

/// A content block.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Text parts.
    pub parts: Vec<GeminiPart>,
}

/// A text part.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Part text.
    #[serde(default)]
    pub text: String,
}

/// Sampling settings.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k sampling.
    pub top_k: u32,
    /// Nucleus sampling.
    pub top_p: f32,
    /// Output token cap.
    pub max_output_tokens: u32,
}

/// A safety threshold.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct SafetySetting {
    /// Harm category.
    pub category: &'static str,
    /// Blocking threshold.
    pub threshold: &'static str,
}

/// `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    /// Candidate completions.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// A candidate completion.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    /// Candidate content.
    pub content: Option<GeminiContent>,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Render the analysis prompt for an entry.
#[doc(hidden)]
pub fn build_prompt(request: &InsightRequest) -> String {
    let breakdown = request
        .emotion_probabilities
        .and_then(|p| serde_json::to_string_pretty(&p).ok())
        .unwrap_or_else(|| "null".to_owned());

    format!(
        "You are a compassionate AI mental health assistant analyzing a journal entry. \
Please provide thoughtful insights and constructive suggestions.

JOURNAL ENTRY:
\"{content}\"

EMOTIONAL DATA:
- User's self-reported mood: {mood}
- AI-detected primary emotion: {emotion}
- Emotion analysis breakdown: {breakdown}

Please analyze this journal entry and provide:

1. INSIGHTS (2-3 sentences):
   - Emotional patterns you notice
   - What the writing reveals about their mental state
   - Any positive aspects or concerning patterns

2. SUGGESTIONS (2-3 actionable recommendations):
   - Specific mental health practices
   - Coping strategies relevant to their emotional state
   - Activities or mindset shifts that could help

Keep your response supportive, professional, and encouraging. Focus on mental wellness and personal growth.

Format your response as:
INSIGHTS: [your insights here]
SUGGESTIONS: [your suggestions here]
",
        content = request.content.as_deref().unwrap_or_default(),
        mood = request.mood,
        emotion = request.emotion.as_deref().unwrap_or("unknown"),
    )
}

/// Build the request body for an entry.
#[doc(hidden)]
pub fn build_request(request: &InsightRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: build_prompt(request),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        },
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: *category,
                threshold: "BLOCK_MEDIUM_AND_ABOVE",
            })
            .collect(),
    }
}

/// Split model text into insights and suggestions.
#[doc(hidden)]
pub fn split_sections(text: &str) -> Insights {
    let section = |pattern: &str| -> Option<String> {
        Regex::new(pattern)
            .ok()?
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().trim().to_owned())
    };

    let insights = section(r"(?s)INSIGHTS:\s*(.*?)(?:SUGGESTIONS:|\z)").unwrap_or_else(|| {
        text.lines()
            .next()
            .filter(|line| !line.is_empty())
            .unwrap_or(DEFAULT_INSIGHTS)
            .to_owned()
    });
    let suggestions =
        section(r"(?s)SUGGESTIONS:\s*(.*)\z").unwrap_or_else(|| DEFAULT_SUGGESTIONS.to_owned());

    Insights {
        insights,
        suggestions,
    }
}

/// Parse a `generateContent` response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body has no candidate text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<Insights, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| ProviderError::Parse("response has no candidate text".to_owned()))?;
    Ok(split_sections(&text))
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Gemini-backed [`InsightTransport`].
#[derive(Clone)]
pub struct GeminiTransport {
    /// Base URL for the API.
    #[doc(hidden)]
    pub base_url: String,
    /// Model name.
    #[doc(hidden)]
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"__REDACTED__")
            .finish()
    }
}

impl GeminiTransport {
    /// Create a transport for `model` at `base_url`.
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            base_url,
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl InsightTransport for GeminiTransport {
    async fn generate(&self, request: &InsightRequest) -> Result<Insights, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await?;
        let body = check_http_response(response).await?;
        parse_response(&body)
    }
}
