//! Bookmark Repository for Smart Bookmark.
//!
//! Implements `BookmarkRepositoryTrait`: list, create and delete for the
//! signed-in user's bookmarks, on top of a remote [`BookmarkTable`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::table_client::BookmarkTable;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::BookmarkError;

/// Trait defining bookmark repository operations.
#[async_trait]
pub trait BookmarkRepositoryTrait: Send + Sync {
    async fn list(&self, owner_id: &str) -> Result<Vec<Bookmark>, BookmarkError>;
    async fn create(&self, owner_id: &str, url: &str, title: Option<&str>) -> Result<(), BookmarkError>;
    async fn delete(&self, id: &str) -> Result<(), BookmarkError>;
}

/// Bookmark repository backed by the remote bookmarks table.
pub struct BookmarkRepository {
    table: Arc<dyn BookmarkTable>,
}

impl BookmarkRepository {
    pub fn new(table: Arc<dyn BookmarkTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl BookmarkRepositoryTrait for BookmarkRepository {
    /// Bookmarks owned by `owner_id`, newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        Ok(self.table.select_by_owner(owner_id).await?)
    }

    /// Inserts one bookmark. An empty `url` is rejected before any remote call;
    /// an empty title is stored as absent.
    async fn create(&self, owner_id: &str, url: &str, title: Option<&str>) -> Result<(), BookmarkError> {
        if url.is_empty() {
            return Err(BookmarkError::MissingUrl);
        }

        let row = NewBookmark {
            owner_id: owner_id.to_string(),
            url: url.to_string(),
            title: title.filter(|t| !t.is_empty()).map(str::to_string),
        };
        self.table.insert(&row).await?;
        tracing::debug!(owner_id, url, "bookmark created");
        Ok(())
    }

    /// Removes the bookmark if the caller owns it. Unknown ids are not an error.
    async fn delete(&self, id: &str) -> Result<(), BookmarkError> {
        self.table.delete_by_id(id).await?;
        tracing::debug!(id, "bookmark deleted");
        Ok(())
    }
}
