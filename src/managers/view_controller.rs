//! View Controller for Smart Bookmark.
//!
//! A two-state machine (Unauthenticated / Authenticated) that owns the entry
//! form, the displayed list and the blocking notice. User actions go to the
//! Session Store or the Bookmark Repository; list refreshes follow every
//! identity change and every successful mutation.
//!
//! Each identity transition bumps an epoch. A list response is applied only
//! while its epoch is current, and only if no later request has already been
//! applied, so a refresh started before a logout can never repopulate the view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::managers::bookmark_repository::BookmarkRepositoryTrait;
use crate::managers::session_store::{SessionStore, SessionSubscription};
use crate::types::bookmark::Bookmark;
use crate::types::errors::{BookmarkError, ViewError};
use crate::types::identity::{AuthState, Identity};

/// Which screen is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Screen {
    Unauthenticated,
    Authenticated { identity: Identity, bookmarks: Vec<Bookmark> },
}

/// Contents of the URL/title entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryForm {
    pub url: String,
    pub title: String,
}

/// A blocking message the user has to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    MissingUrl,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::MissingUrl => "Please enter a URL",
        }
    }
}

/// Everything a surface needs to draw the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    pub screen: Screen,
    pub form: EntryForm,
    pub notice: Option<Notice>,
    #[serde(skip)]
    epoch: u64,
    #[serde(skip)]
    applied_ticket: u64,
}

impl ViewSnapshot {
    fn unauthenticated() -> Self {
        Self {
            screen: Screen::Unauthenticated,
            form: EntryForm::default(),
            notice: None,
            epoch: 0,
            applied_ticket: 0,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.screen {
            Screen::Authenticated { identity, .. } => Some(identity),
            Screen::Unauthenticated => None,
        }
    }

    /// The displayed list; empty while unauthenticated.
    pub fn bookmarks(&self) -> &[Bookmark] {
        match &self.screen {
            Screen::Authenticated { bookmarks, .. } => bookmarks,
            Screen::Unauthenticated => &[],
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.screen, Screen::Authenticated { .. })
    }
}

/// A list fetch bound to the epoch it was issued in.
struct ListRequest {
    epoch: u64,
    ticket: u64,
    owner_id: String,
}

struct Inner {
    session: Arc<SessionStore>,
    repository: Arc<dyn BookmarkRepositoryTrait>,
    view: watch::Sender<ViewSnapshot>,
    tickets: AtomicU64,
}

impl Inner {
    fn request_for(&self, epoch: u64, owner_id: &str) -> ListRequest {
        ListRequest {
            epoch,
            ticket: self.tickets.fetch_add(1, Ordering::SeqCst) + 1,
            owner_id: owner_id.to_string(),
        }
    }

    /// A list request for whoever is currently shown.
    fn current_request(&self) -> Option<ListRequest> {
        let (epoch, owner_id) = {
            let view = self.view.borrow();
            (view.epoch, view.identity()?.id.clone())
        };
        Some(self.request_for(epoch, &owner_id))
    }

    /// Moves the view to `state`. Returns the list request to issue when a
    /// new identity was entered.
    fn apply_auth(&self, state: AuthState) -> Option<ListRequest> {
        let mut entered = None;
        self.view.send_if_modified(|view| match state {
            AuthState::Anonymous => {
                if !view.is_authenticated() {
                    return false;
                }
                view.epoch += 1;
                view.screen = Screen::Unauthenticated;
                view.form = EntryForm::default();
                view.notice = None;
                true
            }
            AuthState::Authenticated(identity) => {
                if view.identity() == Some(&identity) {
                    return false;
                }
                view.epoch += 1;
                entered = Some((view.epoch, identity.id.clone()));
                view.screen = Screen::Authenticated {
                    identity,
                    bookmarks: Vec::new(),
                };
                view.notice = None;
                true
            }
        });
        entered.map(|(epoch, owner_id)| self.request_for(epoch, &owner_id))
    }

    async fn load(&self, request: ListRequest) {
        let bookmarks = match self.repository.list(&request.owner_id).await {
            Ok(bookmarks) => bookmarks,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load bookmarks");
                return;
            }
        };

        let applied = self.view.send_if_modified(|view| {
            if view.epoch != request.epoch || request.ticket <= view.applied_ticket {
                return false;
            }
            view.applied_ticket = request.ticket;
            match &mut view.screen {
                Screen::Authenticated { identity, bookmarks: shown } if identity.id == request.owner_id => {
                    *shown = bookmarks;
                    true
                }
                _ => false,
            }
        });
        if !applied {
            tracing::debug!(epoch = request.epoch, ticket = request.ticket, "discarded stale bookmark list");
        }
    }

    async fn refresh_current(&self) {
        if let Some(request) = self.current_request() {
            self.load(request).await;
        }
    }

    fn owner(&self) -> Result<Identity, ViewError> {
        self.view
            .borrow()
            .identity()
            .cloned()
            .ok_or(ViewError::NotAuthenticated)
    }
}

async fn listen(inner: Arc<Inner>, mut subscription: SessionSubscription, mut refreshes: JoinSet<()>) {
    loop {
        tokio::select! {
            next = subscription.changed() => match next {
                Some(state) => {
                    if let Some(request) = inner.apply_auth(state) {
                        let inner = Arc::clone(&inner);
                        refreshes.spawn(async move { inner.load(request).await });
                    }
                }
                None => break,
            },
            Some(_) = refreshes.join_next(), if !refreshes.is_empty() => {}
        }
    }
    subscription.unsubscribe();
}

/// The mounted view. Dropping it (or calling [`unmount`](Self::unmount))
/// stops listening and aborts in-flight list refreshes.
pub struct ViewController {
    inner: Arc<Inner>,
    listener: JoinHandle<()>,
}

impl ViewController {
    /// Subscribes to `session`, shows its current state and starts
    /// listening. Must be called inside a Tokio runtime.
    pub fn mount(session: Arc<SessionStore>, repository: Arc<dyn BookmarkRepositoryTrait>) -> Self {
        let subscription = session.subscribe();
        let (view, _) = watch::channel(ViewSnapshot::unauthenticated());
        let inner = Arc::new(Inner {
            session,
            repository,
            view,
            tickets: AtomicU64::new(0),
        });

        let mut refreshes = JoinSet::new();
        if let Some(request) = inner.apply_auth(subscription.current()) {
            let initial = Arc::clone(&inner);
            refreshes.spawn(async move { initial.load(request).await });
        }
        let listener = tokio::spawn(listen(Arc::clone(&inner), subscription, refreshes));

        Self { inner, listener }
    }

    pub fn unmount(&self) {
        self.listener.abort();
    }

    pub fn is_mounted(&self) -> bool {
        !self.listener.is_finished()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.inner.view.borrow().clone()
    }

    /// A receiver that observes every view change.
    pub fn snapshots(&self) -> watch::Receiver<ViewSnapshot> {
        self.inner.view.subscribe()
    }

    /// Name of the OAuth provider behind the login action.
    pub fn provider(&self) -> &str {
        self.inner.session.provider()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.inner.view.send_modify(|view| {
            view.form.url = url;
            view.notice = None;
        });
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.inner.view.send_modify(|view| view.form.title = title);
    }

    pub fn dismiss_notice(&self) {
        self.inner.view.send_if_modified(|view| view.notice.take().is_some());
    }

    /// Saves the form as a new bookmark, then clears the form and refreshes.
    /// An empty URL raises the blocking notice and makes no remote call.
    pub async fn save(&self) -> Result<(), ViewError> {
        let owner = self.inner.owner()?;
        let form = self.inner.view.borrow().form.clone();

        if form.url.is_empty() {
            self.inner.view.send_modify(|view| view.notice = Some(Notice::MissingUrl));
            return Err(ViewError::MissingUrl);
        }

        let title = Some(form.title.as_str()).filter(|t| !t.is_empty());
        match self.inner.repository.create(&owner.id, &form.url, title).await {
            Ok(()) => {
                self.inner.view.send_modify(|view| {
                    view.form = EntryForm::default();
                    view.notice = None;
                });
                self.inner.refresh_current().await;
            }
            Err(BookmarkError::MissingUrl) => {
                self.inner.view.send_modify(|view| view.notice = Some(Notice::MissingUrl));
                return Err(ViewError::MissingUrl);
            }
            Err(e) => tracing::warn!(error = %e, "failed to save bookmark"),
        }
        Ok(())
    }

    /// Deletes bookmark `id`, then refreshes the list.
    pub async fn delete(&self, id: &str) -> Result<(), ViewError> {
        self.inner.owner()?;
        match self.inner.repository.delete(id).await {
            Ok(()) => self.inner.refresh_current().await,
            Err(e) => tracing::warn!(error = %e, id, "failed to delete bookmark"),
        }
        Ok(())
    }

    pub async fn refresh(&self) -> Result<(), ViewError> {
        self.inner.owner()?;
        self.inner.refresh_current().await;
        Ok(())
    }

    /// Runs the provider sign-in. Failures are logged and leave the view as it was.
    pub async fn login(&self) -> AuthState {
        match self.inner.session.login_with_provider().await {
            Ok(state) => {
                if let Some(request) = self.inner.apply_auth(state.clone()) {
                    self.inner.load(request).await;
                }
                state
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed");
                self.inner.session.current()
            }
        }
    }

    /// Signs out; the list and the form are cleared even if the provider call fails.
    pub async fn logout(&self) {
        // The store logs provider failures and publishes Anonymous regardless.
        let _ = self.inner.session.logout().await;
        self.inner.apply_auth(AuthState::Anonymous);
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
