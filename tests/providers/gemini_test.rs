//! Gemini request building and section parsing.

use moodjournal::entry::EmotionProbabilities;
use moodjournal::providers::gemini::{build_prompt, build_request, parse_response, split_sections};
use moodjournal::providers::insights::InsightRequest;
use moodjournal::providers::ProviderError;

fn request() -> InsightRequest {
    InsightRequest {
        content: Some("I finally finished the project.".to_owned()),
        emotion: Some("joy".to_owned()),
        emotion_probabilities: Some(EmotionProbabilities {
            anger: 0.0,
            disgust: 0.0,
            fear: 0.05,
            joy: 0.85,
            neutral: 0.1,
            sadness: 0.0,
        }),
        mood: "proud".to_owned(),
    }
}

#[test]
fn prompt_embeds_entry_and_emotional_data() {
    let prompt = build_prompt(&request());

    assert!(prompt.contains("\"I finally finished the project.\""));
    assert!(prompt.contains("self-reported mood: proud"));
    assert!(prompt.contains("primary emotion: joy"));
    assert!(prompt.contains("\"joy\": 0.85"));
    assert!(prompt.contains("INSIGHTS: [your insights here]"));
}

#[test]
fn request_serializes_camel_case_with_safety_settings() {
    let body = serde_json::to_value(build_request(&request())).expect("serialize");

    assert_eq!(body["generationConfig"]["topK"], 40);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    let settings = body["safetySettings"].as_array().expect("array");
    assert_eq!(settings.len(), 4);
    assert!(settings
        .iter()
        .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    assert!(body["contents"][0]["parts"][0]["text"]
        .as_str()
        .is_some_and(|t| t.contains("JOURNAL ENTRY")));
}

#[test]
fn sections_are_split_and_trimmed() {
    let parsed = split_sections(
        "INSIGHTS: You sound accomplished.\n\nSUGGESTIONS:  Celebrate, then rest.\n",
    );

    assert_eq!(parsed.insights, "You sound accomplished.");
    assert_eq!(parsed.suggestions, "Celebrate, then rest.");
}

#[test]
fn unlabelled_text_uses_first_line_and_default_suggestions() {
    let parsed = split_sections("Nice work today.\nMore text here.");

    assert_eq!(parsed.insights, "Nice work today.");
    assert!(parsed.suggestions.starts_with("Continue journaling regularly"));
}

#[test]
fn response_text_is_parsed_from_first_candidate() {
    let body = r#"{"candidates":[{"content":{"parts":[{"text":"INSIGHTS: Calm.\nSUGGESTIONS: Breathe."}]}}]}"#;

    let parsed = parse_response(body).expect("parse");

    assert_eq!(parsed.insights, "Calm.");
    assert_eq!(parsed.suggestions, "Breathe.");
}

#[test]
fn response_without_candidates_is_a_parse_error() {
    assert!(matches!(
        parse_response(r#"{"candidates":[]}"#),
        Err(ProviderError::Parse(_))
    ));
}
