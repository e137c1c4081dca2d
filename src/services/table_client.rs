//! Storage boundary for the bookmarks table.
//!
//! Implements `BookmarkTable` over the backend's PostgREST API. Row
//! visibility is decided remotely by the access policy on `user_id`; the
//! client only forwards the caller's bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};

use crate::services::auth_client::AccessTokenSource;
use crate::services::supabase::{error_parts, SupabaseClient};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StorageError;

/// Default name of the bookmarks table.
pub const DEFAULT_TABLE: &str = "bookmarks";

/// Remote table operations used by the Bookmark Repository.
#[async_trait]
pub trait BookmarkTable: Send + Sync {
    /// Rows with `user_id = owner_id`, newest `created_at` first.
    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StorageError>;

    /// Inserts one row; storage assigns `id` and `created_at`.
    async fn insert(&self, row: &NewBookmark) -> Result<(), StorageError>;

    /// Deletes the row with `id` if the caller may see it. Missing rows are not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), StorageError>;
}

/// `BookmarkTable` backed by PostgREST.
pub struct PostgrestBookmarks {
    client: SupabaseClient,
    tokens: Arc<dyn AccessTokenSource>,
    table: String,
}

impl PostgrestBookmarks {
    pub fn new(client: SupabaseClient, tokens: Arc<dyn AccessTokenSource>, table: impl Into<String>) -> Self {
        Self {
            client,
            tokens,
            table: table.into(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, StorageError> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let (code, message) = error_parts(response).await;
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized(message),
            _ => StorageError::Http { status: code, message },
        })
    }

    async fn request(&self, method: Method) -> Result<reqwest::RequestBuilder, StorageError> {
        let token = self.tokens.access_token().await?;
        let url = self.client.rest_url(&self.table);
        Ok(self.client.request(method, url, token.as_deref()))
    }
}

#[async_trait]
impl BookmarkTable for PostgrestBookmarks {
    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StorageError> {
        tracing::debug!(table = %self.table, owner_id, "selecting bookmarks");
        let owner_filter = format!("eq.{}", owner_id);
        let request = self.request(Method::GET).await?.query(&[
            ("select", "*"),
            ("user_id", owner_filter.as_str()),
            ("order", "created_at.desc"),
        ]);

        self.send(request)
            .await?
            .json::<Vec<Bookmark>>()
            .await
            .map_err(|e| StorageError::Decode(e.to_string()))
    }

    async fn insert(&self, row: &NewBookmark) -> Result<(), StorageError> {
        tracing::debug!(table = %self.table, owner_id = %row.owner_id, "inserting bookmark");
        let request = self
            .request(Method::POST)
            .await?
            .header("Prefer", "return=minimal")
            .json(&[row]);
        self.send(request).await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StorageError> {
        tracing::debug!(table = %self.table, id, "deleting bookmark");
        let id_filter = format!("eq.{}", id);
        let request = self
            .request(Method::DELETE)
            .await?
            .query(&[("id", id_filter.as_str())]);
        self.send(request).await?;
        Ok(())
    }
}
