//! Session Store for Smart Bookmark.
//!
//! Holds the live [`AuthState`]. At start it subscribes to the provider's
//! change channel, then fetches any existing session, then forwards every
//! provider notification into a `watch` channel that views subscribe to.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::services::auth_client::AuthClient;
use crate::services::oauth_callback::Authorizer;
use crate::types::errors::AuthError;
use crate::types::identity::{AuthChange, AuthState};

/// Default OAuth provider.
pub const DEFAULT_PROVIDER: &str = "google";

/// Owns the authentication state and the provider-event forwarder.
pub struct SessionStore {
    auth: Arc<dyn AuthClient>,
    authorizer: Arc<dyn Authorizer>,
    provider: String,
    state: Arc<watch::Sender<AuthState>>,
    forwarder: JoinHandle<()>,
}

/// A registration for session-state changes. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<AuthState>,
}

impl SessionSubscription {
    /// Waits for the next state change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    pub fn unsubscribe(self) {}
}

async fn fetch_state(auth: &dyn AuthClient) -> AuthState {
    match auth.get_session().await {
        Ok(session) => AuthState::from(session.map(|s| s.user.clone())),
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch session, treating as signed out");
            AuthState::Anonymous
        }
    }
}

/// Publishes `next`, waking subscribers only on an actual change.
fn publish(state: &watch::Sender<AuthState>, next: AuthState) {
    state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn forward(
    mut changes: broadcast::Receiver<AuthChange>,
    auth: Arc<dyn AuthClient>,
    state: Arc<watch::Sender<AuthState>>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                tracing::info!(event = ?change.event, "auth state changed");
                publish(&state, change.state);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "missed auth notifications, re-fetching session");
                publish(&state, fetch_state(auth.as_ref()).await);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

impl SessionStore {
    /// Starts the store with `provider` as the OAuth provider used by
    /// [`login_with_provider`](Self::login_with_provider).
    pub async fn start(
        auth: Arc<dyn AuthClient>,
        authorizer: Arc<dyn Authorizer>,
        provider: impl Into<String>,
    ) -> Arc<Self> {
        let changes = auth.subscribe();
        let initial = fetch_state(auth.as_ref()).await;
        tracing::debug!(authenticated = initial.is_authenticated(), "session store started");

        let (tx, _) = watch::channel(initial);
        let state = Arc::new(tx);
        let forwarder = tokio::spawn(forward(changes, Arc::clone(&auth), Arc::clone(&state)));

        Arc::new(Self {
            auth,
            authorizer,
            provider: provider.into(),
            state,
            forwarder,
        })
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.state.subscribe(),
        }
    }

    /// Signs in through the configured provider. On failure the state is
    /// left as it was.
    pub async fn login_with_provider(&self) -> Result<AuthState, AuthError> {
        let request = self
            .auth
            .begin_oauth(&self.provider, &self.authorizer.redirect_uri())?;
        let code = self.authorizer.authorize(&request.authorize_url).await?;
        let session = self.auth.complete_oauth(request, &code).await?;

        let state = AuthState::Authenticated(session.user.clone());
        publish(&self.state, state.clone());
        Ok(state)
    }

    /// Signs out. The state becomes `Anonymous` even when the provider call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let outcome = self.auth.sign_out().await;
        publish(&self.state, AuthState::Anonymous);
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "provider sign-out failed");
        }
        outcome
    }

    /// Re-reads the session from the provider and publishes it.
    pub async fn reload(&self) -> AuthState {
        let state = fetch_state(self.auth.as_ref()).await;
        publish(&self.state, state.clone());
        state
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
