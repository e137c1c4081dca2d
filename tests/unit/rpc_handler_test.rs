//! Unit tests for the RPC handler, covering every method dispatched by `handle_method`.
//!
//! Calls go through the same code path as the `smart-bookmark-rpc` binary,
//! with the view mounted on the in-memory demo backend.

use std::sync::Arc;

use serde_json::{json, Value};

use smart_bookmark::app::{App, DEMO_EMAIL};
use smart_bookmark::managers::bookmark_repository::BookmarkRepositoryTrait;
use smart_bookmark::managers::view_controller::ViewController;
use smart_bookmark::rpc_handler::{handle_method, runs_detached, RateLimiter, MAX_REQUESTS_PER_SECOND};
use smart_bookmark::services::memory_backend::MemoryBackend;

/// Create a mounted view on a fresh demo backend.
async fn setup() -> (Arc<MemoryBackend>, App, ViewController) {
    let (app, backend) = App::demo().await;
    let view = app.mount_view();
    (backend, app, view)
}

async fn call(view: &ViewController, method: &str, params: Value) -> Value {
    handle_method(view, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

async fn signed_in() -> (Arc<MemoryBackend>, App, ViewController) {
    let (backend, app, view) = setup().await;
    call(&view, "session.login", json!({})).await;
    (backend, app, view)
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (_backend, _app, view) = setup().await;
    assert_eq!(call(&view, "ping", json!({})).await, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (_backend, _app, view) = setup().await;
    let err = handle_method(&view, "nonexistent.method", &json!({})).await.unwrap_err();
    assert_eq!(err, "unknown method: nonexistent.method");
}

// ─── View ───

#[tokio::test]
async fn test_view_get_starts_unauthenticated() {
    let (_backend, _app, view) = setup().await;
    let res = call(&view, "view.get", json!({})).await;
    assert_eq!(res["screen"]["state"], "unauthenticated");
    assert_eq!(res["form"], json!({"url": "", "title": ""}));
    assert!(res["notice"].is_null());
}

// ─── Session ───

#[tokio::test]
async fn test_session_login_returns_identity_and_view() {
    let (_backend, _app, view) = setup().await;
    let res = call(&view, "session.login", json!({})).await;

    assert_eq!(res["session"]["status"], "authenticated");
    assert_eq!(res["session"]["email"], DEMO_EMAIL);
    assert_eq!(res["view"]["screen"]["state"], "authenticated");
    assert_eq!(res["view"]["screen"]["bookmarks"], json!([]));
}

#[tokio::test]
async fn test_session_logout_clears_view() {
    let (_backend, _app, view) = signed_in().await;
    call(&view, "bookmark.save", json!({"url": "https://example.com"})).await;

    let res = call(&view, "session.logout", json!({})).await;
    assert_eq!(res["screen"]["state"], "unauthenticated");
}

// ─── Form ───

#[tokio::test]
async fn test_form_set_updates_fields() {
    let (_backend, _app, view) = signed_in().await;
    let res = call(&view, "form.set", json!({"url": "https://a.example", "title": "A"})).await;
    assert_eq!(res["form"], json!({"url": "https://a.example", "title": "A"}));

    let res = call(&view, "form.set", json!({"title": "B"})).await;
    assert_eq!(res["form"], json!({"url": "https://a.example", "title": "B"}));
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_bookmark_save_without_url_reports_notice() {
    let (backend, _app, view) = signed_in().await;

    let err = handle_method(&view, "bookmark.save", &json!({"title": "No url"})).await.unwrap_err();
    assert_eq!(err, "Please enter a URL");
    assert_eq!(backend.insert_calls(), 0);

    let res = call(&view, "view.get", json!({})).await;
    assert_eq!(res["notice"], "missing_url");
}

#[tokio::test]
async fn test_bookmark_save_requires_login() {
    let (_backend, _app, view) = setup().await;
    let err = handle_method(&view, "bookmark.save", &json!({"url": "https://a.example"})).await.unwrap_err();
    assert_eq!(err, "Not signed in");
}

#[tokio::test]
async fn test_bookmark_save_lists_and_clears_form() {
    let (_backend, _app, view) = signed_in().await;

    let res = call(&view, "bookmark.save", json!({"url": "https://example.com", "title": ""})).await;

    let bookmarks = res["screen"]["bookmarks"].as_array().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0]["url"], "https://example.com");
    assert!(bookmarks[0]["title"].is_null());
    assert_eq!(res["form"], json!({"url": "", "title": ""}));
}

#[tokio::test]
async fn test_bookmark_delete_accepts_string_or_number_id() {
    let (backend, _app, view) = signed_in().await;
    call(&view, "bookmark.save", json!({"url": "https://a.example"})).await;
    call(&view, "bookmark.save", json!({"url": "https://b.example"})).await;
    let ids: Vec<String> = backend.all_rows().into_iter().map(|b| b.id).collect();

    call(&view, "bookmark.delete", json!({"id": ids[0]})).await;
    let numeric: u64 = ids[1].parse().unwrap();
    let res = call(&view, "bookmark.delete", json!({"id": numeric})).await;

    assert_eq!(res["screen"]["bookmarks"], json!([]));
    assert_eq!(backend.delete_calls(), 2);
}

#[tokio::test]
async fn test_bookmark_delete_without_id_is_error() {
    let (_backend, _app, view) = signed_in().await;
    let err = handle_method(&view, "bookmark.delete", &json!({})).await.unwrap_err();
    assert_eq!(err, "missing id");
}

#[tokio::test]
async fn test_bookmark_refresh_picks_up_remote_rows() {
    let (backend, app, view) = signed_in().await;
    let owner = view.snapshot().identity().unwrap().id.clone();
    app.repository.create(&owner, "https://elsewhere.example", None).await.unwrap();
    assert_eq!(backend.all_rows().len(), 1);
    assert!(view.snapshot().bookmarks().is_empty());

    let res = call(&view, "bookmark.refresh", json!({})).await;
    assert_eq!(res["screen"]["bookmarks"].as_array().unwrap().len(), 1);
}

// ─── Dispatch ───

#[test]
fn test_only_login_runs_detached() {
    assert!(runs_detached("session.login"));
    for method in ["ping", "view.get", "session.logout", "form.set", "bookmark.save", "bookmark.delete", "bookmark.refresh"] {
        assert!(!runs_detached(method), "{} must run in order", method);
    }
}

#[tokio::test]
async fn test_save_after_form_set_uses_that_form() {
    let (backend, _app, view) = signed_in().await;
    call(&view, "form.set", json!({"url": "https://ordered.example", "title": "Ordered"})).await;
    let res = call(&view, "bookmark.save", json!({})).await;

    assert_eq!(res["screen"]["bookmarks"][0]["url"], "https://ordered.example");
    assert_eq!(res["screen"]["bookmarks"][0]["title"], "Ordered");
    assert_eq!(backend.insert_calls(), 1);
}

// ─── Rate limit ───

#[test]
fn test_rate_limiter_rejects_past_budget() {
    let mut limiter = RateLimiter::new(MAX_REQUESTS_PER_SECOND);
    for _ in 0..MAX_REQUESTS_PER_SECOND {
        assert!(limiter.check());
    }
    assert!(!limiter.check());
    assert!(!limiter.check());
}

#[test]
fn test_rate_limiter_resets_after_window() {
    let mut limiter = RateLimiter::new(2);
    assert!(limiter.check());
    assert!(limiter.check());
    assert!(!limiter.check());

    std::thread::sleep(std::time::Duration::from_millis(1050));
    assert!(limiter.check());
}
