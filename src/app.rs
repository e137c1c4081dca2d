//! App Core for Smart Bookmark.
//!
//! Builds the backend clients, the Session Store and the Bookmark Repository
//! from an [`AppConfig`], and mounts views on top of them.

use std::fs;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::connection::Database;
use crate::managers::bookmark_repository::BookmarkRepository;
use crate::managers::session_store::{SessionStore, DEFAULT_PROVIDER};
use crate::managers::view_controller::ViewController;
use crate::services::auth_client::{AuthClient, GoTrueAuth};
use crate::services::memory_backend::{MemoryBackend, StaticAuthorizer};
use crate::services::oauth_callback::{Authorizer, LoopbackAuthorizer};
use crate::services::supabase::SupabaseClient;
use crate::services::table_client::{BookmarkTable, PostgrestBookmarks};
use crate::services::token_store::{TokenStore, TokenStoreTrait};
use crate::types::errors::AppError;

/// Who signs in when the demo console runs `login`.
pub const DEMO_EMAIL: &str = "demo@smart-bookmark.local";

/// Central application struct holding the session and the repository.
pub struct App {
    pub session: Arc<SessionStore>,
    pub repository: Arc<BookmarkRepository>,
}

impl App {
    /// Connects to the configured hosted project. The provider session is
    /// persisted under the config's data directory.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        config.validate_remote()?;

        let data_dir = config.data_dir();
        fs::create_dir_all(&data_dir)?;
        let db = Arc::new(Database::open(config.database_path())?);
        let tokens: Arc<dyn TokenStoreTrait> =
            Arc::new(TokenStore::with_passphrase(db, config.session_passphrase())?);

        let client = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key)?;
        let auth = Arc::new(GoTrueAuth::new(client.clone(), tokens));
        let table = Arc::new(PostgrestBookmarks::new(client, auth.clone(), config.bookmarks_table.as_str()));
        let authorizer = Arc::new(LoopbackAuthorizer::new(config.callback_port));

        tracing::debug!(url = %config.supabase_url, data_dir = %data_dir.display(), "connecting");
        Ok(Self::with_backends(auth, table, authorizer, &config.oauth_provider).await)
    }

    /// An app on a fresh [`MemoryBackend`]; `login` signs in as [`DEMO_EMAIL`].
    pub async fn demo() -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let app = Self::with_backends(
            backend.clone(),
            backend.clone(),
            Arc::new(StaticAuthorizer::new(DEMO_EMAIL)),
            DEFAULT_PROVIDER,
        )
        .await;
        (app, backend)
    }

    pub async fn with_backends(
        auth: Arc<dyn AuthClient>,
        table: Arc<dyn BookmarkTable>,
        authorizer: Arc<dyn Authorizer>,
        provider: &str,
    ) -> Self {
        let session = SessionStore::start(auth, authorizer, provider).await;
        let repository = Arc::new(BookmarkRepository::new(table));
        Self { session, repository }
    }

    /// Mounts a new view on this app's session and repository.
    pub fn mount_view(&self) -> ViewController {
        ViewController::mount(self.session.clone(), self.repository.clone())
    }
}
