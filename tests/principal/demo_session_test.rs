//! Demo sign-in seeds local storage; sign-out clears it.

use std::sync::Arc;

use chrono::Utc;

use moodjournal::principal::{
    clear_demo_cookie, demo_cookie, has_demo_cookie, AuthError, DemoCredentials, DemoSession,
    NoIdentity, PrincipalKind, PrincipalResolver,
};
use moodjournal::store::demo::demo_entries;
use moodjournal::store::local::LocalStore;
use moodjournal::store::medium::{LocalMedium, MemoryMedium};
use moodjournal::store::DEMO_USER_SLOT;

fn session() -> (DemoSession, LocalStore, Arc<dyn LocalMedium>) {
    let medium: Arc<dyn LocalMedium> = Arc::new(MemoryMedium::new());
    let local = LocalStore::new(Arc::clone(&medium));
    let session = DemoSession::new(
        DemoCredentials {
            username: "devpostdemo".to_owned(),
            password: "HPAISTUDIO".to_owned(),
        },
        local.clone(),
    );
    (session, local, medium)
}

#[tokio::test]
async fn sign_in_seeds_demo_entries_once() {
    let (session, local, medium) = session();

    let cookie = session
        .sign_in("devpostdemo", "HPAISTUDIO")
        .await
        .expect("sign in");

    assert_eq!(cookie, demo_cookie());
    assert!(has_demo_cookie(&format!("theme=dark; {cookie}")));

    let ids: Vec<String> = local
        .list(None)
        .await
        .expect("list")
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, ["demo-1", "demo-2", "demo-3"]);

    let resolver = PrincipalResolver::new(Arc::new(NoIdentity), Arc::clone(&medium));
    assert_eq!(resolver.resolve().await.kind, PrincipalKind::Demo);

    local.delete("demo-2").await.expect("delete");
    session
        .sign_in("devpostdemo", "HPAISTUDIO")
        .await
        .expect("second sign in");
    assert_eq!(local.list(None).await.expect("list").len(), 2);
}

#[tokio::test]
async fn wrong_password_is_rejected_without_side_effects() {
    let (session, local, medium) = session();

    let result = session.sign_in("devpostdemo", "wrong").await;

    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert_eq!(medium.get_item(DEMO_USER_SLOT).await.expect("get"), None);
    assert!(!local.is_initialized().await.expect("check"));
}

#[tokio::test]
async fn sign_out_clears_principal_and_entries() {
    let (session, local, medium) = session();
    session
        .sign_in("devpostdemo", "HPAISTUDIO")
        .await
        .expect("sign in");

    let cookie = session.sign_out().await.expect("sign out");

    assert_eq!(cookie, clear_demo_cookie());
    assert!(!has_demo_cookie(&cookie));
    assert_eq!(medium.get_item(DEMO_USER_SLOT).await.expect("get"), None);
    assert!(!local.is_initialized().await.expect("check"));
}

#[test]
fn seeds_are_dated_newest_first() {
    let seeds = demo_entries(Utc::now());

    assert_eq!(seeds.len(), 3);
    assert!(seeds.windows(2).all(|w| w[0].date >= w[1].date));
    assert!(seeds
        .iter()
        .all(|e| e.user_id.as_deref() == Some("demo-user-id")));
    assert!(seeds.iter().all(|e| e.excerpt.chars().count() <= 153));
}
