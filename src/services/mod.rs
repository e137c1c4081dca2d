// Smart Bookmark services
// Remote boundaries (auth, table), the in-process backend, and local session crypto/persistence.

pub mod auth_client;
pub mod crypto_service;
pub mod memory_backend;
pub mod oauth_callback;
pub mod supabase;
pub mod table_client;
pub mod token_store;
