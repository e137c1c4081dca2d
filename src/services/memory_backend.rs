//! In-process backend.
//!
//! [`MemoryBackend`] implements both remote boundaries in memory with the
//! same owner-scoped row policy the hosted table applies: a caller only sees,
//! inserts and deletes rows whose `user_id` is its own identity id. It backs
//! `smart-bookmark demo` and the test suites, and carries a few knobs for
//! simulating slow or failing storage and sign-ins from elsewhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::services::auth_client::{AuthClient, OAuthRequest};
use crate::services::oauth_callback::Authorizer;
use crate::services::table_client::BookmarkTable;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{AuthError, StorageError};
use crate::types::identity::{AuthChange, Identity};
use crate::types::session::AuthSession;

const SESSION_LIFETIME_SECS: i64 = 3600;

#[derive(Default)]
struct BackendState {
    /// Known users keyed by email.
    users: HashMap<String, Identity>,
    rows: Vec<Bookmark>,
    next_id: u64,
    last_created: Option<DateTime<Utc>>,
    session: Option<AuthSession>,
}

impl BackendState {
    fn uid(&self) -> Option<String> {
        self.session.as_ref().map(|session| session.user.id.clone())
    }

    fn user_for(&mut self, email: &str) -> Identity {
        self.users
            .entry(email.to_string())
            .or_insert_with(|| Identity::new(Uuid::new_v4().to_string(), email))
            .clone()
    }

    /// Strictly increasing so ordering by `created_at` is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_created {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(at);
        at
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Identity provider and bookmarks table living in process memory.
pub struct MemoryBackend {
    state: Mutex<BackendState>,
    events: broadcast::Sender<AuthChange>,
    /// Parked selects in arrival order; `None` while selects pass straight through.
    held_selects: Mutex<Option<Vec<oneshot::Sender<()>>>>,
    failing: AtomicBool,
    select_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(BackendState::default()),
            events,
            held_selects: Mutex::new(None),
            failing: AtomicBool::new(false),
            select_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        locked(&self.state)
    }

    fn emit(&self, change: AuthChange) {
        let _ = self.events.send(change);
    }

    fn start_session(&self, email: &str) -> AuthSession {
        let mut state = self.lock();
        let user = state.user_for(email);
        let session = AuthSession {
            access_token: format!("memory-{}", Uuid::new_v4()),
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "bearer".to_string(),
            expires_in: SESSION_LIFETIME_SECS,
            expires_at: None,
            user,
        }
        .with_expiry_from(Utc::now().timestamp());
        state.session = Some(session.clone());
        session
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Network("memory backend unavailable".to_string()));
        }
        Ok(())
    }

    /// Signs `email` in without going through the view, as another tab would.
    pub fn sign_in_elsewhere(&self, email: &str) -> Identity {
        let session = self.start_session(email);
        self.emit(AuthChange::signed_in(session.user.clone()));
        session.user.clone()
    }

    /// Ends the session from outside, as an expiry or a sign-out in another tab would.
    pub fn sign_out_elsewhere(&self) {
        self.lock().session = None;
        self.emit(AuthChange::signed_out());
    }

    /// Makes every table operation fail with a network error until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Selects still read their rows immediately but do not return until
    /// released, one at a time or all together with
    /// [`release_selects`](Self::release_selects).
    pub fn hold_selects(&self) {
        locked(&self.held_selects).get_or_insert_with(Vec::new);
    }

    /// Lets every parked select return and stops holding new ones.
    pub fn release_selects(&self) {
        let parked = locked(&self.held_selects).take().unwrap_or_default();
        for select in parked {
            let _ = select.send(());
        }
    }

    /// Lets the most recently parked select return; later selects stay held.
    pub fn release_newest_select(&self) -> bool {
        let newest = locked(&self.held_selects).as_mut().and_then(|parked| parked.pop());
        newest.map(|select| select.send(()).is_ok()).unwrap_or(false)
    }

    /// Lets the earliest parked select return; later selects stay held.
    pub fn release_oldest_select(&self) -> bool {
        let oldest = locked(&self.held_selects)
            .as_mut()
            .filter(|parked| !parked.is_empty())
            .map(|parked| parked.remove(0));
        oldest.map(|select| select.send(()).is_ok()).unwrap_or(false)
    }

    /// Number of selects currently parked.
    pub fn held_selects(&self) -> usize {
        locked(&self.held_selects).as_ref().map_or(0, Vec::len)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Every stored row regardless of owner.
    pub fn all_rows(&self) -> Vec<Bookmark> {
        self.lock().rows.clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthClient for MemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.lock().session.clone())
    }

    fn begin_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthRequest, AuthError> {
        let mut authorize_url =
            Url::parse("memory://provider/authorize").map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        authorize_url
            .query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(OAuthRequest {
            authorize_url,
            code_verifier: Zeroizing::new(Uuid::new_v4().to_string()),
        })
    }

    /// The authorization code is the email of the user signing in.
    async fn complete_oauth(&self, _request: OAuthRequest, auth_code: &str) -> Result<AuthSession, AuthError> {
        if auth_code.is_empty() {
            return Err(AuthError::Denied("empty authorization code".to_string()));
        }
        let session = self.start_session(auth_code);
        self.emit(AuthChange::signed_in(session.user.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().session = None;
        self.emit(AuthChange::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl BookmarkTable for MemoryBackend {
    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StorageError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut rows: Vec<Bookmark> = {
            let state = self.lock();
            let uid = state.uid();
            state
                .rows
                .iter()
                .filter(|row| row.owner_id == owner_id && uid.as_deref() == Some(owner_id))
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let parked = locked(&self.held_selects).as_mut().map(|parked| {
            let (release, wait) = oneshot::channel();
            parked.push(release);
            wait
        });
        if let Some(wait) = parked {
            let _ = wait.await;
        }
        Ok(rows)
    }

    async fn insert(&self, row: &NewBookmark) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut state = self.lock();
        match state.uid() {
            Some(uid) if uid == row.owner_id => {}
            Some(_) => {
                return Err(StorageError::Unauthorized(
                    "new row violates row-level security policy".to_string(),
                ))
            }
            None => return Err(StorageError::Unauthorized("no session".to_string())),
        }

        state.next_id += 1;
        let bookmark = Bookmark {
            id: state.next_id.to_string(),
            owner_id: row.owner_id.clone(),
            url: row.url.clone(),
            title: row.title.clone(),
            created_at: state.next_timestamp(),
        };
        state.rows.push(bookmark);
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut state = self.lock();
        if let Some(uid) = state.uid() {
            state.rows.retain(|row| !(row.id == id && row.owner_id == uid));
        }
        Ok(())
    }
}

/// Authorizer that answers immediately with a fixed code.
pub struct StaticAuthorizer {
    code: String,
}

impl StaticAuthorizer {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    fn redirect_uri(&self) -> String {
        "memory://callback".to_string()
    }

    async fn authorize(&self, _authorize_url: &Url) -> Result<String, AuthError> {
        Ok(self.code.clone())
    }
}
