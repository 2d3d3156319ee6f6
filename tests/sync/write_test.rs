//! Create and update routing, fallback, and error propagation.

use std::sync::Arc;

use moodjournal::entry::{EmotionProbabilities, EntryPatch, NewEntry, Source};
use moodjournal::store::medium::{LocalMedium, MemoryMedium};
use moodjournal::sync::JournalError;

use crate::support::{day, entry, harness, DownClassifier, HarnessBuilder, MockRemote, Who, USER_ID};

fn new_entry(content: &str) -> NewEntry {
    NewEntry {
        title: "Morning".to_owned(),
        content: content.to_owned(),
        mood: "happy".to_owned(),
        tags: vec!["gratitude".to_owned(), "family".to_owned()],
        date: Some(day(2024, 5, 1)),
    }
}

#[tokio::test]
async fn create_writes_remote_when_available() {
    let h = harness(MockRemote::new(), Who::Authenticated).await;

    let served = h
        .engine
        .create(new_entry("A good day."))
        .await
        .expect("create should succeed");

    assert_eq!(served.source, Source::Database);
    assert_eq!(served.data.user_id.as_deref(), Some(USER_ID));
    assert_eq!(served.data.emotion.as_deref(), Some("joy"));
    assert_eq!(h.remote.rows().len(), 1);
    assert!(h.local.list(None).await.expect("local list").is_empty());
    assert_eq!(h.engine.fallback_count(), 0);
}

#[tokio::test]
async fn create_falls_back_to_local_when_remote_unavailable() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;

    let served = h
        .engine
        .create(new_entry("Wrote this offline."))
        .await
        .expect("fallback create should succeed");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert!(served.data.id.starts_with("demo-"));

    let stored = h.local.get(&served.data.id).await.expect("entry stored locally");
    assert_eq!(stored, served.data);
    assert_eq!(stored.tags, vec!["gratitude".to_owned(), "family".to_owned()]);
    assert_eq!(h.engine.fallback_count(), 1);
}

#[tokio::test]
async fn offline_create_with_classifier_down_keeps_neutral_fallback_and_excerpt() {
    let content: String = "Today I walked along the river and thought about the year. "
        .chars()
        .cycle()
        .take(200)
        .collect();
    let h = HarnessBuilder::new(MockRemote::failing(), Who::Authenticated)
        .classifier(Arc::new(DownClassifier))
        .build()
        .await;

    let served = h
        .engine
        .create(new_entry(&content))
        .await
        .expect("create should succeed");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert_eq!(served.data.emotion.as_deref(), Some("neutral"));
    assert_eq!(
        served.data.emotion_probabilities,
        Some(EmotionProbabilities::FALLBACK)
    );
    let expected_excerpt = format!("{}...", content.chars().take(150).collect::<String>());
    assert_eq!(served.data.excerpt, expected_excerpt);
    assert_eq!(served.data.content.as_deref(), Some(content.as_str()));
}

#[tokio::test]
async fn update_falls_back_to_local_copy() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;
    let local = entry("demo-1", day(2024, 5, 2), Some(USER_ID));
    h.local.replace_all(&[local]).await.expect("seed local");

    let served = h
        .engine
        .update(
            "demo-1",
            EntryPatch {
                title: Some("Renamed".to_owned()),
                ..EntryPatch::default()
            },
        )
        .await
        .expect("fallback update should succeed");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert_eq!(served.data.title, "Renamed");
    assert_eq!(
        h.local.get("demo-1").await.expect("local entry").title,
        "Renamed"
    );
}

#[tokio::test]
async fn update_missing_remote_row_updates_local_copy() {
    let h = harness(MockRemote::new(), Who::Authenticated).await;
    let local = entry("demo-9", day(2024, 5, 2), Some(USER_ID));
    h.local.replace_all(&[local]).await.expect("seed local");

    let served = h
        .engine
        .update(
            "demo-9",
            EntryPatch {
                mood: Some("tired".to_owned()),
                ..EntryPatch::default()
            },
        )
        .await
        .expect("local update");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert_eq!(served.data.mood, "tired");
    assert_eq!(h.engine.fallback_count(), 1);
}

#[tokio::test]
async fn update_missing_everywhere_is_not_found() {
    let h = harness(MockRemote::new(), Who::Authenticated).await;

    let result = h
        .engine
        .update(
            "ghost",
            EntryPatch {
                mood: Some("tired".to_owned()),
                ..EntryPatch::default()
            },
        )
        .await;

    assert!(matches!(result, Err(JournalError::NotFound(id)) if id == "ghost"));
}

#[tokio::test]
async fn update_content_rederives_excerpt() {
    let row = entry("row-9", day(2024, 5, 3), Some(USER_ID));
    let h = harness(MockRemote::with_rows(vec![row]), Who::Authenticated).await;
    let long = "x".repeat(160);

    let served = h
        .engine
        .update(
            "row-9",
            EntryPatch {
                content: Some(long),
                ..EntryPatch::default()
            },
        )
        .await
        .expect("update should succeed");

    assert_eq!(served.source, Source::Database);
    assert_eq!(served.data.excerpt, format!("{}...", "x".repeat(150)));
    assert!(served.data.updated_at >= served.data.created_at);
}

#[tokio::test]
async fn both_stores_down_surfaces_medium_unavailable() {
    let medium: Arc<dyn LocalMedium> = Arc::new(MemoryMedium::unavailable());
    let h = HarnessBuilder::new(MockRemote::failing(), Who::Authenticated)
        .medium(medium)
        .build()
        .await;

    let result = h.engine.create(new_entry("Nowhere to go.")).await;

    assert!(matches!(
        result,
        Err(JournalError::StorageMediumUnavailable(_))
    ));
}
