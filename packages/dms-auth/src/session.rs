//! Process-wide session store.
//!
//! The store is the single source of truth for "is the user
//! authenticated". State lives inside a `tokio::sync::watch` channel so
//! every token transition is observable by the route guard (and anything
//! else that subscribes) without the store knowing its consumers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::storage::{StorageError, TokenStorage};

/// Snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Server-issued credential; `None` means signed out.
    pub token: Option<String>,
    /// True only while the initial restore of a persisted token runs.
    pub is_loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Sign-in failed because the token could not be persisted. The in-memory
/// session was left untouched.
#[derive(Debug, thiserror::Error)]
#[error("sign-in could not be persisted")]
pub struct SignInError(#[source] pub StorageError);

/// Owner of the in-memory and persisted session token.
pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Create a store in its pre-restore state (`token: None`,
    /// `is_loading: true`).
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionState {
            token: None,
            is_loading: true,
        });
        Self { storage, state }
    }

    /// Subscribe to session transitions. The route guard lives on the
    /// receiving end of this channel.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().token.is_some()
    }

    /// One-time read of the persisted token. Ends with `is_loading: false`
    /// whatever happens; an unreadable store is operationally the same as
    /// no session, so read failures are logged and swallowed. Calling
    /// again after the first restore is a no-op.
    pub async fn restore(&self) {
        if !self.state.borrow().is_loading {
            return;
        }
        let token = match self.storage.load().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("failed to load persisted session: {e}");
                None
            }
        };
        tracing::debug!(restored = token.is_some(), "session restore finished");
        self.state.send_modify(|s| {
            s.token = token;
            s.is_loading = false;
        });
    }

    /// Persist the token, then publish it. If persistence fails the
    /// in-memory state is left untouched, so storage and memory cannot
    /// silently disagree across a restart.
    pub async fn sign_in(&self, token: impl Into<String>) -> Result<(), SignInError> {
        let token = token.into();
        self.storage.store(&token).await.map_err(SignInError)?;
        self.state.send_modify(|s| s.token = Some(token));
        tracing::info!("session established");
        Ok(())
    }

    /// Remove the persisted token, then clear the in-memory one. Signing
    /// out while already signed out is a no-op.
    pub async fn sign_out(&self) -> Result<(), StorageError> {
        if self.state.borrow().token.is_none() {
            return Ok(());
        }
        self.storage.clear().await?;
        self.state.send_modify(|s| s.token = None);
        tracing::info!("session cleared");
        Ok(())
    }
}
