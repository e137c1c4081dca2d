//! Unit tests for the Bookmark Repository public API.
//!
//! Runs against the in-memory backend, which applies the same owner-scoped
//! row policy as the hosted table.

use std::sync::Arc;

use rstest::rstest;
use smart_bookmark::managers::bookmark_repository::{BookmarkRepository, BookmarkRepositoryTrait};
use smart_bookmark::services::memory_backend::MemoryBackend;
use smart_bookmark::types::errors::{BookmarkError, StorageError};
use smart_bookmark::types::identity::Identity;

/// Helper: a repository over a fresh backend with `alice` signed in.
fn setup() -> (Arc<MemoryBackend>, BookmarkRepository, Identity) {
    let backend = Arc::new(MemoryBackend::new());
    let alice = backend.sign_in_elsewhere("alice@example.com");
    let repo = BookmarkRepository::new(backend.clone());
    (backend, repo, alice)
}

#[tokio::test]
async fn test_list_is_empty_for_new_user() {
    let (_backend, repo, alice) = setup();
    assert!(repo.list(&alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_url_is_rejected_without_remote_call() {
    let (backend, repo, alice) = setup();

    let err = repo.create(&alice.id, "", Some("Title only")).await.unwrap_err();

    assert!(matches!(err, BookmarkError::MissingUrl));
    assert_eq!(backend.insert_calls(), 0);
    assert!(backend.all_rows().is_empty());
}

#[rstest]
#[case(Some("Rust"), Some("Rust"), "Rust")]
#[case(Some(""), None, "No Title")]
#[case(None, None, "No Title")]
#[tokio::test]
async fn test_create_then_list_shows_bookmark(
    #[case] title: Option<&str>,
    #[case] stored: Option<&str>,
    #[case] shown: &str,
) {
    let (_backend, repo, alice) = setup();

    repo.create(&alice.id, "https://rust-lang.org", title).await.unwrap();

    let list = repo.list(&alice.id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].url, "https://rust-lang.org");
    assert_eq!(list[0].owner_id, alice.id);
    assert_eq!(list[0].title.as_deref(), stored);
    assert_eq!(list[0].display_title(), shown);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let (_backend, repo, alice) = setup();
    for url in ["https://1.example", "https://2.example", "https://3.example"] {
        repo.create(&alice.id, url, None).await.unwrap();
    }

    let urls: Vec<String> = repo
        .list(&alice.id)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.url)
        .collect();
    assert_eq!(urls, ["https://3.example", "https://2.example", "https://1.example"]);
}

#[tokio::test]
async fn test_duplicate_urls_are_allowed() {
    let (_backend, repo, alice) = setup();
    repo.create(&alice.id, "https://same.example", None).await.unwrap();
    repo.create(&alice.id, "https://same.example", None).await.unwrap();
    assert_eq!(repo.list(&alice.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_removes_only_that_bookmark() {
    let (_backend, repo, alice) = setup();
    repo.create(&alice.id, "https://keep.example", None).await.unwrap();
    repo.create(&alice.id, "https://drop.example", None).await.unwrap();
    let doomed = repo.list(&alice.id).await.unwrap()[0].id.clone();

    repo.delete(&doomed).await.unwrap();

    let list = repo.list(&alice.id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(list.iter().all(|b| b.id != doomed));
}

#[tokio::test]
async fn test_delete_unknown_id_is_not_an_error() {
    let (_backend, repo, _alice) = setup();
    assert!(repo.delete("does-not-exist").await.is_ok());
}

#[tokio::test]
async fn test_other_users_bookmarks_are_invisible() {
    let (backend, repo, alice) = setup();
    repo.create(&alice.id, "https://alice.example", None).await.unwrap();

    let bob = backend.sign_in_elsewhere("bob@example.com");
    assert!(repo.list(&bob.id).await.unwrap().is_empty());
    assert!(repo.list(&alice.id).await.unwrap().is_empty(), "policy hides rows of other owners");

    let alice_row = backend.all_rows()[0].id.clone();
    repo.delete(&alice_row).await.unwrap();
    assert_eq!(backend.all_rows().len(), 1, "bob cannot delete alice's bookmark");
}

#[tokio::test]
async fn test_storage_failures_propagate() {
    let (backend, repo, alice) = setup();
    backend.set_failing(true);

    assert!(matches!(
        repo.list(&alice.id).await,
        Err(BookmarkError::Storage(StorageError::Network(_)))
    ));
    assert!(matches!(
        repo.create(&alice.id, "https://x.example", None).await,
        Err(BookmarkError::Storage(_))
    ));
}
