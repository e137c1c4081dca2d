//! Authorization step of the OAuth sign-in.
//!
//! The provider needs a browser; [`LoopbackAuthorizer`] prints the authorize
//! link and serves `/auth/callback` on `127.0.0.1` until the provider
//! redirects back with a `code` (or an `error`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use reqwest::Url;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::types::errors::AuthError;

/// Path the provider redirects back to.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Default loopback port for the redirect listener.
pub const DEFAULT_CALLBACK_PORT: u16 = 8976;

/// How long the listener may take to finish answering after the code arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Sends the user through the provider's consent screen and returns the
/// authorization code.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Where the provider should send the user afterwards.
    fn redirect_uri(&self) -> String;

    async fn authorize(&self, authorize_url: &Url) -> Result<String, AuthError>;
}

/// Query parameters of the provider's redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// What the redirect carried.
#[derive(Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Denied(String),
}

impl CallbackParams {
    /// An error wins over a code; the description is preferred over the bare error.
    pub fn outcome(self) -> CallbackOutcome {
        match (self.code, self.error_description.or(self.error)) {
            (_, Some(reason)) => CallbackOutcome::Denied(reason),
            (Some(code), None) if !code.is_empty() => CallbackOutcome::Code(code),
            _ => CallbackOutcome::Denied("callback carried no authorization code".to_string()),
        }
    }
}

/// Hands the first callback's outcome to the waiting `authorize` call.
type OutcomeSlot = Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>;

fn page(message: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><body><h1>Smart Bookmark</h1><p>{}</p></body></html>",
        message
    ))
}

async fn callback(State(slot): State<OutcomeSlot>, Query(params): Query<CallbackParams>) -> (StatusCode, Html<String>) {
    let outcome = params.outcome();
    let reply = match &outcome {
        CallbackOutcome::Code(_) => (StatusCode::OK, page("Signed in. You can close this tab.")),
        CallbackOutcome::Denied(reason) => {
            tracing::info!(%reason, "provider denied sign-in");
            (StatusCode::BAD_REQUEST, page("Sign-in failed. You can close this tab."))
        }
    };

    match slot.lock().await.take() {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => tracing::debug!("ignoring repeated OAuth callback"),
    }
    reply
}

fn router(slot: OutcomeSlot) -> Router {
    Router::new().route(CALLBACK_PATH, get(callback)).with_state(slot)
}

/// Authorizer that waits for the browser redirect on a loopback port.
pub struct LoopbackAuthorizer {
    port: u16,
}

impl LoopbackAuthorizer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for LoopbackAuthorizer {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACK_PORT)
    }
}

#[async_trait]
impl Authorizer for LoopbackAuthorizer {
    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    async fn authorize(&self, authorize_url: &Url) -> Result<String, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| AuthError::Callback(format!("cannot listen on port {}: {}", self.port, e)))?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = router(Arc::new(Mutex::new(Some(outcome_tx))));
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        eprintln!("Open this link in your browser to sign in:\n\n  {}\n", authorize_url);
        tracing::info!(port = self.port, "waiting for OAuth redirect");

        let outcome = outcome_rx.await;
        let _ = stop_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
            Ok(Ok(Err(e))) => tracing::debug!(error = %e, "callback listener stopped with an error"),
            Ok(_) => {}
            Err(_) => tracing::debug!("callback listener still draining connections"),
        }

        match outcome {
            Ok(CallbackOutcome::Code(code)) => Ok(code),
            Ok(CallbackOutcome::Denied(reason)) => Err(AuthError::Denied(reason)),
            Err(_) => Err(AuthError::Callback("callback listener stopped before a redirect arrived".to_string())),
        }
    }
}
