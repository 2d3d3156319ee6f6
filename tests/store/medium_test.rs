//! SQLite-backed slots.

use moodjournal::store::medium::{LocalMedium, MemoryMedium, SqliteMedium};
use moodjournal::store::{LocalError, FORCE_MODE_SLOT};
use moodjournal::sync::policy::ForceMode;

#[tokio::test]
async fn sqlite_slots_round_trip_and_persist_across_reopen() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("nested").join("journal.db");

    {
        let medium = SqliteMedium::open(&path).await.expect("open");
        assert_eq!(medium.get_item("demo-entries").await.expect("get"), None);

        medium.set_item("demo-entries", "[]").await.expect("set");
        medium
            .set_item("demo-entries", "[1]")
            .await
            .expect("overwrite");
        assert_eq!(
            medium.get_item("demo-entries").await.expect("get").as_deref(),
            Some("[1]")
        );
        medium.pool().close().await;
    }

    let reopened = SqliteMedium::open(&path).await.expect("reopen");
    assert_eq!(
        reopened.get_item("demo-entries").await.expect("get").as_deref(),
        Some("[1]")
    );

    reopened.remove_item("demo-entries").await.expect("remove");
    reopened.remove_item("demo-entries").await.expect("remove twice");
    assert_eq!(reopened.get_item("demo-entries").await.expect("get"), None);
}

#[tokio::test]
async fn force_mode_persists_in_its_slot() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let medium = SqliteMedium::open(&tmp.path().join("journal.db"))
        .await
        .expect("open");

    assert_eq!(ForceMode::load(&medium).await.expect("load"), None);

    ForceMode::store(&medium, Some(ForceMode::LocalStorage))
        .await
        .expect("store");
    assert_eq!(
        medium.get_item(FORCE_MODE_SLOT).await.expect("get").as_deref(),
        Some("localStorage")
    );
    assert_eq!(
        ForceMode::load(&medium).await.expect("load"),
        Some(ForceMode::LocalStorage)
    );

    ForceMode::store(&medium, None).await.expect("clear");
    assert_eq!(ForceMode::load(&medium).await.expect("load"), None);
}

#[tokio::test]
async fn unknown_force_mode_value_is_ignored() {
    let medium = MemoryMedium::new();
    medium
        .set_item(FORCE_MODE_SLOT, "cloud")
        .await
        .expect("set");

    assert_eq!(ForceMode::load(&medium).await.expect("load"), None);
}

#[tokio::test]
async fn unavailable_medium_fails_every_call() {
    let medium = MemoryMedium::unavailable();

    assert!(matches!(
        medium.get_item("k").await,
        Err(LocalError::MediumUnavailable(_))
    ));
    assert!(matches!(
        medium.set_item("k", "v").await,
        Err(LocalError::MediumUnavailable(_))
    ));
    assert!(matches!(
        medium.remove_item("k").await,
        Err(LocalError::MediumUnavailable(_))
    ));
}
