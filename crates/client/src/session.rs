//! Session identity shared between the API client and the cart engine.
//!
//! Authentication itself (login, registration) lives in a separate service;
//! this module only holds the session credential and broadcasts forced
//! logouts so the UI can redirect to the login view when the backend
//! reports an expired session.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use tokio::sync::watch;

/// Authentication lifecycle events observable by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// No session activity yet.
    Idle,
    /// A session credential was installed.
    SignedIn,
    /// The session ended. `redirect_to_login` is set when the backend
    /// rejected the credential (HTTP 401) rather than the user logging out.
    SignedOut { redirect_to_login: bool },
}

/// Shared session state.
///
/// Cheaply cloneable via `Arc`; every clone observes the same credential.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    token: RwLock<Option<SecretString>>,
    events: watch::Sender<AuthEvent>,
}

impl Session {
    /// Create an unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = watch::channel(AuthEvent::Idle);
        Self {
            inner: Arc::new(SessionInner {
                token: RwLock::new(None),
                events,
            }),
        }
    }

    /// Whether a session credential is currently installed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_token().is_some()
    }

    /// The current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.read_token()
    }

    /// Install a session credential (after a successful login).
    pub fn sign_in(&self, token: SecretString) {
        *self.write_token() = Some(token);
        let _ = self.inner.events.send(AuthEvent::SignedIn);
    }

    /// Drop the session credential (user-initiated logout).
    pub fn sign_out(&self) {
        *self.write_token() = None;
        let _ = self.inner.events.send(AuthEvent::SignedOut {
            redirect_to_login: false,
        });
    }

    /// Drop the session credential because the backend rejected it.
    ///
    /// Broadcasts a forced-logout event so the UI performs a hard redirect
    /// to the login view.
    pub fn expire(&self) {
        *self.write_token() = None;
        let _ = self.inner.events.send(AuthEvent::SignedOut {
            redirect_to_login: true,
        });
    }

    /// Subscribe to authentication lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    fn read_token(&self) -> Option<SecretString> {
        self.inner
            .token
            .read()
            .expect("session lock poisoned")
            .clone()
    }

    fn write_token(&self) -> std::sync::RwLockWriteGuard<'_, Option<SecretString>> {
        self.inner.token.write().expect("session lock poisoned")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field(
                "token",
                &self.read_token().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
