//! List and get: remote first, local on failure, mirroring of full reads.

use moodjournal::entry::{NewEntry, Source};
use moodjournal::store::{DateRange, ListQuery};
use moodjournal::sync::JournalError;

use crate::support::{day, entry, harness, HarnessBuilder, MockRemote, Who, USER_ID};

fn rows() -> Vec<moodjournal::entry::JournalEntry> {
    vec![
        entry("row-1", day(2024, 4, 1), Some(USER_ID)),
        entry("row-2", day(2024, 4, 3), Some(USER_ID)),
        entry("row-3", day(2024, 4, 2), Some(USER_ID)),
    ]
}

#[tokio::test]
async fn repeated_bounded_reads_are_identical() {
    let h = harness(MockRemote::with_rows(rows()), Who::Authenticated).await;
    let query = ListQuery {
        limit: Some(2),
        range: None,
    };

    let first = h.engine.list(query).await.expect("first read");
    let second = h.engine.list(query).await.expect("second read");

    assert_eq!(first, second);
    assert_eq!(first.source, Source::Database);
    let ids: Vec<&str> = first.data.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["row-2", "row-3"]);
}

#[tokio::test]
async fn repeated_fallback_reads_are_identical() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;
    h.local
        .replace_all(&[
            entry("demo-2", day(2024, 4, 2), Some(USER_ID)),
            entry("demo-1", day(2024, 4, 1), Some(USER_ID)),
        ])
        .await
        .expect("seed local");

    let first = h.engine.list(ListQuery::default()).await.expect("first read");
    let second = h.engine.list(ListQuery::default()).await.expect("second read");

    assert_eq!(first, second);
    assert_eq!(first.source, Source::LocalStorageFallback);
    let ids: Vec<&str> = first.data.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["demo-2", "demo-1"]);
    assert_eq!(h.engine.fallback_count(), 2);
}

#[tokio::test]
async fn unbounded_read_is_mirrored_locally() {
    let h = harness(MockRemote::with_rows(rows()), Who::Authenticated).await;
    h.local
        .replace_all(&[entry("row-gone", day(2023, 1, 1), Some(USER_ID))])
        .await
        .expect("seed local");

    let served = h.engine.list(ListQuery::default()).await.expect("read");

    assert_eq!(served.source, Source::DatabaseSynced);
    assert_eq!(h.local.list(None).await.expect("local list"), served.data);
}

#[tokio::test]
async fn fallback_write_survives_mirrored_read() {
    let h = harness(MockRemote::with_rows(rows()), Who::Authenticated).await;
    h.remote.set_unavailable(true);
    let written = h
        .engine
        .create(NewEntry {
            title: "Offline".to_owned(),
            content: "Written while the server was down.".to_owned(),
            mood: "calm".to_owned(),
            tags: Vec::new(),
            date: Some(day(2024, 4, 4)),
        })
        .await
        .expect("fallback create");
    assert_eq!(written.source, Source::LocalStorageFallback);
    h.remote.set_unavailable(false);

    let served = h.engine.list(ListQuery::default()).await.expect("read");

    assert_eq!(served.source, Source::DatabaseSynced);
    assert_eq!(served.data.len(), 3);
    let ids: Vec<String> = h
        .local
        .list(None)
        .await
        .expect("local list")
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, [written.data.id.as_str(), "row-2", "row-3", "row-1"]);

    let read_back = h.engine.get(&written.data.id).await.expect("still readable");
    assert_eq!(read_back.source, Source::LocalStorageFallback);
    assert_eq!(read_back.data, written.data);
}

#[tokio::test]
async fn mirroring_can_be_disabled() {
    let h = HarnessBuilder::new(MockRemote::with_rows(rows()), Who::Authenticated)
        .no_mirror()
        .build()
        .await;

    let served = h.engine.list(ListQuery::default()).await.expect("read");

    assert_eq!(served.source, Source::Database);
    assert!(!h.local.is_initialized().await.expect("slot check"));
}

#[tokio::test]
async fn bounded_read_is_not_mirrored() {
    let h = harness(MockRemote::with_rows(rows()), Who::Authenticated).await;

    let served = h
        .engine
        .list(ListQuery {
            limit: Some(1),
            range: None,
        })
        .await
        .expect("read");

    assert_eq!(served.source, Source::Database);
    assert!(!h.local.is_initialized().await.expect("slot check"));
}

#[tokio::test]
async fn local_range_filter_keeps_stored_order() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;
    h.local
        .replace_all(&[
            entry("demo-3", day(2024, 4, 3), Some(USER_ID)),
            entry("demo-2", day(2024, 4, 2), Some(USER_ID)),
            entry("demo-1", day(2024, 4, 1), Some(USER_ID)),
        ])
        .await
        .expect("seed local");

    let served = h
        .engine
        .list(ListQuery {
            limit: None,
            range: Some(DateRange {
                start: day(2024, 4, 1),
                end: day(2024, 4, 2),
            }),
        })
        .await
        .expect("fallback read");

    assert_eq!(served.source, Source::LocalStorageFallback);
    let ids: Vec<&str> = served.data.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["demo-2", "demo-1"]);
}

#[tokio::test]
async fn get_falls_back_to_local() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;
    let local = entry("demo-5", day(2024, 4, 5), Some(USER_ID));
    h.local.replace_all(&[local.clone()]).await.expect("seed local");

    let served = h.engine.get("demo-5").await.expect("fallback get");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert_eq!(served.data, local);
}

#[tokio::test]
async fn get_missing_everywhere_is_not_found() {
    let h = harness(MockRemote::failing(), Who::Authenticated).await;

    let result = h.engine.get("nope").await;

    assert!(matches!(result, Err(JournalError::NotFound(id)) if id == "nope"));
}

#[tokio::test]
async fn remote_miss_is_served_from_local_copy() {
    let h = harness(MockRemote::new(), Who::Authenticated).await;
    let local = entry("demo-5", day(2024, 4, 5), Some(USER_ID));
    h.local.replace_all(&[local.clone()]).await.expect("seed local");

    let served = h.engine.get("demo-5").await.expect("local get");

    assert_eq!(served.source, Source::LocalStorageFallback);
    assert_eq!(served.data, local);
    assert_eq!(h.engine.fallback_count(), 1);
}
