use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

/// What the identity provider hands us after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity_id: String,
    pub email: String,
    pub token: Option<String>,
}

/// The identity/session provider, treated as opaque.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<Session>;

    /// Ends the session so no partially synced state persists.
    async fn sign_out(&self);
}

/// Session held in memory; signing out forgets it.
#[derive(Debug, Default)]
pub struct InMemorySession {
    session: Mutex<Option<Session>>,
}

impl InMemorySession {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionProvider for InMemorySession {
    async fn current_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn sign_out(&self) {
        let previous = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = previous {
            info!(identity = %session.identity_id, "signed out");
        }
    }
}
