//! Unit tests for the View Controller state machine.
//!
//! The view is mounted on the in-memory backend; assertions on list contents
//! wait for the eventual state rather than racing the listener task.

use std::sync::Arc;
use std::time::Duration;

use smart_bookmark::app::App;
use smart_bookmark::managers::view_controller::{Notice, Screen, ViewController, ViewSnapshot};
use smart_bookmark::services::memory_backend::{MemoryBackend, StaticAuthorizer};
use smart_bookmark::services::table_client::BookmarkTable;
use smart_bookmark::types::bookmark::NewBookmark;
use smart_bookmark::types::errors::ViewError;
use smart_bookmark::ui::render::render;
use tokio::time::{sleep, timeout};

const ALICE: &str = "alice@example.com";

async fn setup() -> (Arc<MemoryBackend>, ViewController) {
    let backend = Arc::new(MemoryBackend::new());
    let app = App::with_backends(
        backend.clone(),
        backend.clone(),
        Arc::new(StaticAuthorizer::new(ALICE)),
        "google",
    )
    .await;
    (backend, app.mount_view())
}

async fn wait_until(view: &ViewController, check: impl Fn(&ViewSnapshot) -> bool) -> ViewSnapshot {
    let mut snapshots = view.snapshots();
    let snapshot = timeout(Duration::from_secs(2), snapshots.wait_for(|s| check(s)))
        .await
        .expect("view never reached the expected state")
        .expect("view was dropped")
        .clone();
    snapshot
}

async fn wait_for_held(backend: &MemoryBackend, count: usize) {
    timeout(Duration::from_secs(2), async {
        while backend.held_selects() < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("select was never issued");
}

async fn signed_in(view: &ViewController) -> ViewSnapshot {
    view.login().await;
    wait_until(view, |s| s.is_authenticated()).await
}

#[tokio::test]
async fn test_mounts_unauthenticated_with_login_action() {
    let (_backend, view) = setup().await;
    let snapshot = view.snapshot();
    assert_eq!(snapshot.screen, Screen::Unauthenticated);
    assert!(render(&snapshot, view.provider()).contains("Login with Google"));
}

#[tokio::test]
async fn test_login_shows_email_and_empty_list() {
    let (_backend, view) = setup().await;
    let snapshot = signed_in(&view).await;

    assert_eq!(snapshot.identity().unwrap().email, ALICE);
    assert!(snapshot.bookmarks().is_empty());
    let text = render(&snapshot, view.provider());
    assert!(text.contains(ALICE));
    assert!(text.contains("No bookmarks added yet."));
}

#[tokio::test]
async fn test_existing_session_loads_list_on_mount() {
    let backend = Arc::new(MemoryBackend::new());
    let alice = backend.sign_in_elsewhere(ALICE);
    backend
        .insert(&NewBookmark {
            owner_id: alice.id.clone(),
            url: "https://before-mount.example".to_string(),
            title: None,
        })
        .await
        .unwrap();

    let app = App::with_backends(backend.clone(), backend.clone(), Arc::new(StaticAuthorizer::new(ALICE)), "google").await;
    let view = app.mount_view();

    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 1).await;
    assert_eq!(snapshot.bookmarks()[0].url, "https://before-mount.example");
}

#[tokio::test]
async fn test_save_without_url_raises_notice_and_skips_remote() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_title("Just a title");

    assert_eq!(view.save().await, Err(ViewError::MissingUrl));

    let snapshot = view.snapshot();
    assert_eq!(snapshot.notice, Some(Notice::MissingUrl));
    assert_eq!(backend.insert_calls(), 0);
    assert!(render(&snapshot, view.provider()).contains("Please enter a URL"));

    view.set_url("https://example.com");
    assert_eq!(view.snapshot().notice, None);
}

#[tokio::test]
async fn test_save_with_empty_title_shows_placeholder() {
    let (_backend, view) = setup().await;
    signed_in(&view).await;

    view.set_url("https://example.com");
    view.set_title("");
    view.save().await.unwrap();

    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 1).await;
    assert_eq!(snapshot.bookmarks()[0].url, "https://example.com");
    assert_eq!(snapshot.bookmarks()[0].display_title(), "No Title");
    assert_eq!(snapshot.form.url, "");
    assert_eq!(snapshot.form.title, "");
}

#[tokio::test]
async fn test_two_saves_list_newest_first() {
    let (_backend, view) = setup().await;
    signed_in(&view).await;

    for (url, title) in [("https://first.example", "First"), ("https://second.example", "Second")] {
        view.set_url(url);
        view.set_title(title);
        view.save().await.unwrap();
    }

    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 2).await;
    let titles: Vec<&str> = snapshot.bookmarks().iter().map(|b| b.display_title()).collect();
    assert_eq!(titles, ["Second", "First"]);
}

#[tokio::test]
async fn test_delete_refreshes_list() {
    let (_backend, view) = setup().await;
    signed_in(&view).await;
    for url in ["https://keep.example", "https://drop.example"] {
        view.set_url(url);
        view.save().await.unwrap();
    }
    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 2).await;
    let doomed = snapshot.bookmarks()[0].id.clone();

    view.delete(&doomed).await.unwrap();

    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 1).await;
    assert!(snapshot.bookmarks().iter().all(|b| b.id != doomed));
}

#[tokio::test]
async fn test_actions_require_identity() {
    let (backend, view) = setup().await;
    view.set_url("https://example.com");

    assert_eq!(view.save().await, Err(ViewError::NotAuthenticated));
    assert_eq!(view.delete("1").await, Err(ViewError::NotAuthenticated));
    assert_eq!(view.refresh().await, Err(ViewError::NotAuthenticated));
    assert_eq!(backend.insert_calls(), 0);
}

#[tokio::test]
async fn test_logout_clears_list_and_form() {
    let (_backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://example.com");
    view.save().await.unwrap();
    wait_until(&view, |s| s.bookmarks().len() == 1).await;
    view.set_url("half typed");

    view.logout().await;

    let snapshot = wait_until(&view, |s| !s.is_authenticated()).await;
    assert!(snapshot.bookmarks().is_empty());
    assert_eq!(snapshot.form.url, "");
}

#[tokio::test]
async fn test_refresh_in_flight_during_logout_never_repopulates() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://example.com");
    view.save().await.unwrap();
    wait_until(&view, |s| s.bookmarks().len() == 1).await;

    backend.hold_selects();
    let before = backend.select_calls();
    let interleave = async {
        while backend.select_calls() == before {
            sleep(Duration::from_millis(5)).await;
        }
        view.logout().await;
        backend.release_selects();
    };
    let (refreshed, ()) = tokio::join!(view.refresh(), interleave);
    refreshed.unwrap();

    sleep(Duration::from_millis(50)).await;
    let snapshot = view.snapshot();
    assert_eq!(snapshot.screen, Screen::Unauthenticated);
    assert!(snapshot.bookmarks().is_empty());
}

#[tokio::test]
async fn test_older_list_never_overwrites_newer() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://first.example");
    view.save().await.unwrap();
    wait_until(&view, |s| s.bookmarks().len() == 1).await;

    backend.hold_selects();
    let newer = async {
        wait_for_held(&backend, 1).await;
        view.set_url("https://second.example");
        let release_save = async {
            wait_for_held(&backend, 2).await;
            backend.release_newest_select();
        };
        let (saved, ()) = tokio::join!(view.save(), release_save);
        saved.unwrap();
        assert_eq!(view.snapshot().bookmarks().len(), 2);
        backend.release_selects();
    };
    let (refreshed, ()) = tokio::join!(view.refresh(), newer);
    refreshed.unwrap();

    sleep(Duration::from_millis(50)).await;
    let snapshot = view.snapshot();
    assert_eq!(snapshot.bookmarks().len(), 2);
    assert_eq!(snapshot.bookmarks()[0].url, "https://second.example");
}

#[tokio::test]
async fn test_list_from_before_relogin_as_same_user_is_discarded() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://old.example");
    view.save().await.unwrap();
    wait_until(&view, |s| s.bookmarks().len() == 1).await;

    backend.hold_selects();
    let relogin = async {
        wait_for_held(&backend, 1).await;
        view.logout().await;
        let alice = backend.sign_in_elsewhere(ALICE);
        backend
            .insert(&NewBookmark {
                owner_id: alice.id.clone(),
                url: "https://new.example".to_string(),
                title: None,
            })
            .await
            .unwrap();

        wait_for_held(&backend, 2).await;
        backend.release_oldest_select();
        sleep(Duration::from_millis(50)).await;
        let snapshot = view.snapshot();
        assert_eq!(snapshot.identity().map(|who| who.id.clone()), Some(alice.id));
        assert!(snapshot.bookmarks().is_empty());
        backend.release_selects();
    };
    let (refreshed, ()) = tokio::join!(view.refresh(), relogin);
    refreshed.unwrap();

    let snapshot = wait_until(&view, |s| s.bookmarks().len() == 2).await;
    assert_eq!(snapshot.bookmarks()[0].url, "https://new.example");
}

#[tokio::test]
async fn test_identity_switch_replaces_list() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://alice.example");
    view.save().await.unwrap();
    wait_until(&view, |s| s.bookmarks().len() == 1).await;

    let bob = backend.sign_in_elsewhere("bob@example.com");

    let snapshot = wait_until(&view, |s| s.identity() == Some(&bob)).await;
    assert!(snapshot.bookmarks().is_empty());
    sleep(Duration::from_millis(50)).await;
    assert!(view.snapshot().bookmarks().is_empty(), "alice's rows never show for bob");
}

#[tokio::test]
async fn test_remote_failure_is_silent() {
    let (backend, view) = setup().await;
    signed_in(&view).await;
    view.set_url("https://kept.example");
    view.save().await.unwrap();
    let before = wait_until(&view, |s| s.bookmarks().len() == 1).await;

    backend.set_failing(true);
    view.set_url("https://lost.example");
    assert_eq!(view.save().await, Ok(()));

    let after = view.snapshot();
    assert_eq!(after.bookmarks(), before.bookmarks());
    assert_eq!(after.form.url, "https://lost.example", "form is kept when the save fails");
    assert_eq!(after.notice, None);
}

#[tokio::test]
async fn test_unmounted_view_ignores_session_changes() {
    let (backend, view) = setup().await;
    signed_in(&view).await;

    view.unmount();
    backend.sign_out_elsewhere();
    sleep(Duration::from_millis(50)).await;

    assert!(!view.is_mounted());
    assert!(view.snapshot().is_authenticated());
}
