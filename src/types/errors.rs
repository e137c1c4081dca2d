use thiserror::Error;

// === CryptoError ===

/// Errors related to cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Failed to derive encryption key from a passphrase.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    /// Encryption operation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// Decryption operation failed.
    #[error("Decryption failed: {0}")]
    Decryption(String),
    /// Failed to generate random bytes.
    #[error("Random generation failed: {0}")]
    RandomGeneration(String),
    /// The provided key is invalid.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

// === TokenStoreError ===

/// Errors raised while persisting the provider session locally.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Failed to serialize or deserialize session data.
    #[error("Session serialization error: {0}")]
    Serialization(String),
    /// Database operation failed.
    #[error("Session database error: {0}")]
    Database(String),
    /// Cryptographic operation failed while sealing or opening session data.
    #[error("Session crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

// === AuthError ===

/// Errors surfaced by the identity provider boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request never produced a response.
    #[error("Auth network error: {0}")]
    Network(String),
    /// The provider answered with a non-success status.
    #[error("Auth provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    /// The provider's response could not be decoded.
    #[error("Invalid auth response: {0}")]
    InvalidResponse(String),
    /// The user (or provider) refused the authorization request.
    #[error("Authorization denied: {0}")]
    Denied(String),
    /// The redirect callback could not be received.
    #[error("Authorization callback failed: {0}")]
    Callback(String),
    /// Local session persistence failed.
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
    /// Generating the PKCE secret failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

// === StorageError ===

/// Errors surfaced by the bookmarks table boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The request never produced a response.
    #[error("Storage network error: {0}")]
    Network(String),
    /// The access policy rejected the request.
    #[error("Storage request unauthorized: {0}")]
    Unauthorized(String),
    /// Storage answered with a non-success status.
    #[error("Storage error ({status}): {message}")]
    Http { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("Storage decode error: {0}")]
    Decode(String),
    /// Obtaining the caller's bearer token failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

// === BookmarkError ===

/// Errors related to bookmark repository operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// Save was attempted without a URL.
    #[error("Please enter a URL")]
    MissingUrl,
    /// The remote table operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === ViewError ===

/// Errors returned by view actions. Remote failures never reach this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    /// Save was attempted without a URL.
    #[error("Please enter a URL")]
    MissingUrl,
    /// The action needs a signed-in identity.
    #[error("Not signed in")]
    NotAuthenticated,
}

// === ConfigError ===

/// Errors related to loading the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided by the file or the environment.
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
    /// A setting was present but unusable.
    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    /// The config file could not be read.
    #[error("Config I/O error: {0}")]
    Io(String),
    /// The config file is not valid JSON for `AppConfig`.
    #[error("Config parse error: {0}")]
    Parse(String),
}

// === AppError ===

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
