//! # Session State
//!
//! The single source of truth for who is signed in.
//!
//! [`SessionStore`] is an explicit service handed to every consumer. It
//! owns the current [`SessionState`] and publishes each transition on a
//! `tokio::sync::watch` channel so UI layers can re-render.
//!
//! ```text
//! Loading ──resolve_startup──► Unauthenticated ◄──logout── Authenticated(role)
//!    │                               └─────────login─────────►   ▲
//!    └──────────────────resolve_startup─────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::claims::{self, Claims, Role};
use crate::credential::Credential;
use crate::store::CredentialStore;

/// Snapshot of the session.
///
/// A credential is held only together with the claims it decoded to, so
/// claims never exist without a credential and an undecodable credential
/// is never held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    loading: bool,
    current: Option<(Credential, Claims)>,
}

impl SessionState {
    /// Initial state before startup resolution.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            current: None,
        }
    }

    /// Resolved with no session.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            loading: false,
            current: None,
        }
    }

    /// Resolved with a decoded credential.
    #[must_use]
    pub fn authenticated(credential: Credential, claims: Claims) -> Self {
        Self {
            loading: false,
            current: Some((credential, claims)),
        }
    }

    /// Whether startup resolution is still pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The current credential.
    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.current.as_ref().map(|(credential, _)| credential)
    }

    /// Claims decoded from the current credential.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        self.current.as_ref().map(|(_, claims)| claims)
    }

    /// Fold the state into its state-machine position.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.loading {
            return SessionStatus::Loading;
        }
        match self.claims() {
            Some(claims) => SessionStatus::Authenticated(claims.role),
            None => SessionStatus::Unauthenticated,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::loading()
    }
}

/// State-machine position of a [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup resolution has not completed.
    Loading,
    /// No usable credential.
    Unauthenticated,
    /// Signed in with the given role.
    Authenticated(Role),
}

/// Shared handle to the process-wide session.
///
/// Cheaply cloneable; all clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    resolved: AtomicBool,
}

impl SessionStore {
    /// Create a session in the `Loading` state over `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            inner: Arc::new(Inner {
                store,
                state,
                resolved: AtomicBool::new(false),
            }),
        }
    }

    /// Resolve the persisted credential into a session.
    ///
    /// Runs once per process: later calls return the current status
    /// without touching the store. A persisted credential that does not
    /// decode is cleared and the session becomes unauthenticated.
    pub fn resolve_startup(&self) -> SessionStatus {
        if self.inner.resolved.swap(true, Ordering::SeqCst) {
            return self.status();
        }

        let next = match self.inner.store.get() {
            None => {
                tracing::debug!("No persisted credential");
                SessionState::unauthenticated()
            }
            Some(credential) => match claims::decode(&credential) {
                Ok(claims) => {
                    tracing::info!(
                        subject = %claims.subject,
                        role = %claims.role,
                        "Restored session"
                    );
                    SessionState::authenticated(credential, claims)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding undecodable persisted credential");
                    self.inner.store.clear();
                    SessionState::unauthenticated()
                }
            },
        };

        let status = next.status();
        self.inner.state.send_replace(next);
        status
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Current state-machine position.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// Claims of the current session, if signed in.
    #[must_use]
    pub fn claims(&self) -> Option<Claims> {
        self.inner.state.borrow().claims().cloned()
    }

    /// Receive every subsequent transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Persist and publish a freshly issued credential.
    pub(crate) fn establish(&self, credential: Credential, claims: Claims) {
        self.inner.resolved.store(true, Ordering::SeqCst);
        self.inner.store.set(credential.clone());
        self.inner
            .state
            .send_replace(SessionState::authenticated(credential, claims));
    }

    /// Clear the store and drop the session. Safe with no prior session.
    pub fn logout(&self) {
        self.inner.resolved.store(true, Ordering::SeqCst);
        self.inner.store.clear();
        self.inner.state.send_replace(SessionState::unauthenticated());
        tracing::info!("Logged out");
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
