//! Token Store for Smart Bookmark.
//!
//! Persists the provider session (the only local state the app keeps) with
//! AES-256-GCM encryption via CryptoService and SQLite persistence.
//!
//! The sealing key is derived from a passphrase and a salt kept in the same
//! database. With the built-in passphrase that is obfuscation only: anyone who
//! can read the database file can open the session. Pass a secret held outside
//! the database to [`TokenStore::with_passphrase`] (the app reads it from the
//! `session_key` setting) to protect the session at rest.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use zeroize::Zeroizing;

use crate::database::connection::Database;
use crate::services::crypto_service::{CryptoService, CryptoServiceTrait};
use crate::types::errors::TokenStoreError;
use crate::types::session::{AuthSession, EncryptedData};

/// Built-in passphrase, used when no session key is configured.
pub const DEFAULT_SESSION_PASSPHRASE: &str = "smart-bookmark-session-key-v1";

/// Trait defining local session persistence.
pub trait TokenStoreTrait: Send + Sync {
    fn save(&self, session: &AuthSession) -> Result<(), TokenStoreError>;
    fn load(&self) -> Result<Option<AuthSession>, TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Session persistence backed by SQLite + CryptoService.
pub struct TokenStore {
    db: Arc<Database>,
    crypto: CryptoService,
    key: Zeroizing<Vec<u8>>,
}

impl TokenStore {
    /// Creates a TokenStore sealed with the built-in passphrase.
    pub fn new(db: Arc<Database>) -> Result<Self, TokenStoreError> {
        Self::with_passphrase(db, DEFAULT_SESSION_PASSPHRASE)
    }

    /// Creates a TokenStore, deriving the sealing key from `passphrase` and the
    /// database's salt (generated on first use). A session sealed under one
    /// passphrase cannot be loaded under another.
    pub fn with_passphrase(db: Arc<Database>, passphrase: &str) -> Result<Self, TokenStoreError> {
        let crypto = CryptoService::new();
        let salt = Self::load_or_create_salt(&db, &crypto)?;
        let key = Zeroizing::new(crypto.derive_key(passphrase, &salt)?);
        Ok(Self { db, crypto, key })
    }

    fn load_or_create_salt(db: &Database, crypto: &CryptoService) -> Result<Vec<u8>, TokenStoreError> {
        let conn = db.connection();
        let existing: Option<Vec<u8>> = conn
            .query_row("SELECT salt FROM store_salt WHERE id = 'default'", [], |row| row.get(0))
            .optional()
            .map_err(|e| TokenStoreError::Database(e.to_string()))?;

        if let Some(salt) = existing {
            return Ok(salt);
        }

        let salt = crypto.generate_salt()?;
        conn.execute(
            "INSERT INTO store_salt (id, salt) VALUES ('default', ?1)",
            params![salt],
        )
        .map_err(|e| TokenStoreError::Database(e.to_string()))?;
        Ok(salt)
    }
}

impl TokenStoreTrait for TokenStore {
    /// Serializes the session to JSON, encrypts it, and replaces the stored row.
    fn save(&self, session: &AuthSession) -> Result<(), TokenStoreError> {
        let json = Zeroizing::new(
            serde_json::to_vec(session).map_err(|e| TokenStoreError::Serialization(e.to_string()))?,
        );
        let sealed = self.crypto.encrypt_aes256gcm(&json, &self.key)?;
        let now = chrono::Utc::now().timestamp();

        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO auth_session (id, encrypted_data, iv, auth_tag, updated_at)
                 VALUES ('current', ?1, ?2, ?3, ?4)",
                params![sealed.ciphertext, sealed.iv, sealed.auth_tag, now],
            )
            .map_err(|e| TokenStoreError::Database(e.to_string()))?;

        tracing::debug!(user_id = %session.user.id, "persisted auth session");
        Ok(())
    }

    /// Restores the stored session, if any.
    fn load(&self) -> Result<Option<AuthSession>, TokenStoreError> {
        let row = self
            .db
            .connection()
            .query_row(
                "SELECT encrypted_data, iv, auth_tag FROM auth_session WHERE id = 'current'",
                [],
                |row| {
                    Ok(EncryptedData {
                        ciphertext: row.get(0)?,
                        iv: row.get(1)?,
                        auth_tag: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| TokenStoreError::Database(e.to_string()))?;

        let Some(sealed) = row else {
            return Ok(None);
        };

        let json = Zeroizing::new(self.crypto.decrypt_aes256gcm(&sealed, &self.key)?);
        let session: AuthSession =
            serde_json::from_slice(&json).map_err(|e| TokenStoreError::Serialization(e.to_string()))?;
        Ok(Some(session))
    }

    /// Removes the stored session.
    fn clear(&self) -> Result<(), TokenStoreError> {
        self.db
            .connection()
            .execute("DELETE FROM auth_session", [])
            .map_err(|e| TokenStoreError::Database(e.to_string()))?;
        Ok(())
    }
}
