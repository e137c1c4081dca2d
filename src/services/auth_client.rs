//! Identity provider boundary.
//!
//! [`AuthClient`] is what the Session Store talks to; [`GoTrueAuth`] implements
//! it against the backend's `/auth/v1` API using the PKCE OAuth flow, and keeps
//! the session persisted through the [`TokenStoreTrait`].

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use zeroize::Zeroizing;

use crate::services::crypto_service::{CryptoService, CryptoServiceTrait};
use crate::services::supabase::{error_parts, SupabaseClient};
use crate::services::token_store::TokenStoreTrait;
use crate::types::errors::AuthError;
use crate::types::identity::AuthChange;
use crate::types::session::AuthSession;

/// Sessions this close to expiry are refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A started OAuth sign-in: the URL to send the user to, plus the secret
/// needed to redeem the code that comes back.
pub struct OAuthRequest {
    pub authorize_url: Url,
    pub code_verifier: Zeroizing<String>,
}

/// Operations the app needs from the identity provider.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Returns the current session, refreshing it if it is about to expire.
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError>;

    /// Prepares an OAuth sign-in with `provider`, redirecting to `redirect_to`.
    fn begin_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthRequest, AuthError>;

    /// Redeems the authorization code returned to the redirect URI.
    async fn complete_oauth(&self, request: OAuthRequest, auth_code: &str) -> Result<AuthSession, AuthError>;

    /// Ends the session locally and, best effort, at the provider.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Registers for session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Source of the bearer token the table client sends.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, AuthError>;
}

#[async_trait]
impl<T: AuthClient + ?Sized> AccessTokenSource for T {
    async fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self
            .get_session()
            .await?
            .map(|session| session.access_token.clone()))
    }
}

/// `AuthClient` backed by the backend's GoTrue API.
pub struct GoTrueAuth {
    client: SupabaseClient,
    tokens: Arc<dyn TokenStoreTrait>,
    crypto: CryptoService,
    session: RwLock<Option<AuthSession>>,
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<AuthChange>,
}

impl GoTrueAuth {
    pub fn new(client: SupabaseClient, tokens: Arc<dyn TokenStoreTrait>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            tokens,
            crypto: CryptoService::new(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    fn cached(&self) -> Option<AuthSession> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_cached(&self, session: Option<AuthSession>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn emit(&self, change: AuthChange) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(change);
    }

    /// Stores a freshly issued session in memory and on disk.
    fn adopt(&self, session: AuthSession) -> Result<AuthSession, AuthError> {
        let session = session.with_expiry_from(chrono::Utc::now().timestamp());
        self.tokens.save(&session)?;
        self.set_cached(Some(session.clone()));
        Ok(session)
    }

    /// Drops the session everywhere and announces the sign-out.
    fn forget(&self) {
        self.set_cached(None);
        if let Err(e) = self.tokens.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.emit(AuthChange::signed_out());
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession, AuthError> {
        let mut url = self.client.auth_url("token");
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        tracing::debug!(grant_type, "requesting provider token");
        let response = self
            .client
            .request(Method::POST, url, None)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(AuthError::Provider { status, message });
        }

        response
            .json::<AuthSession>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let issued = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        let session = self.adopt(issued)?;
        tracing::info!(user_id = %session.user.id, "auth session refreshed");
        self.emit(AuthChange::token_refreshed(session.user.clone()));
        Ok(session)
    }
}

#[async_trait]
impl AuthClient for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let session = match self.cached() {
            Some(session) => session,
            None => match self.tokens.load()? {
                Some(stored) => {
                    self.set_cached(Some(stored.clone()));
                    stored
                }
                None => return Ok(None),
            },
        };

        let now = chrono::Utc::now().timestamp();
        if !session.expires_within(now, EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        // Refresh tokens are single-use; only one refresh may be in flight.
        let _guard = self.refresh_lock.lock().await;
        let expiring = match self.cached() {
            Some(current) if !current.expires_within(now, EXPIRY_MARGIN_SECS) => return Ok(Some(current)),
            Some(current) => current,
            None => return Ok(None),
        };

        match self.refresh(&expiring.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed, signing out locally");
                self.forget();
                Ok(None)
            }
        }
    }

    fn begin_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthRequest, AuthError> {
        let pkce = self.crypto.pkce_pair()?;

        let mut authorize_url = self.client.auth_url("authorize");
        authorize_url
            .query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "s256");

        Ok(OAuthRequest {
            authorize_url,
            code_verifier: pkce.verifier,
        })
    }

    async fn complete_oauth(&self, request: OAuthRequest, auth_code: &str) -> Result<AuthSession, AuthError> {
        let issued = self
            .token_grant(
                "pkce",
                json!({
                    "auth_code": auth_code,
                    "code_verifier": request.code_verifier.as_str(),
                }),
            )
            .await?;
        let session = self.adopt(issued)?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.emit(AuthChange::signed_in(session.user.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let access_token = self.cached().map(|session| session.access_token.clone());

        if let Some(token) = access_token {
            let mut url = self.client.auth_url("logout");
            url.query_pairs_mut().append_pair("scope", "local");
            let outcome = self
                .client
                .request(Method::POST, url, Some(&token))
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    let (status, message) = error_parts(response).await;
                    tracing::warn!(status, %message, "provider rejected sign-out");
                }
                Err(e) => tracing::warn!(error = %e, "sign-out request failed"),
            }
        }

        self.forget();
        tracing::info!("signed out");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}
