//! Explicit session lifecycle

use crate::error::{Result, SessionError};
use crate::types::{Session, UserRole};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Holds the signed-in user, if any.
///
/// Constructed once at startup and shared by `Arc` with whatever needs it.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, replacing any session that is still active
    pub async fn create(
        &self,
        user_id: &str,
        role: UserRole,
        display_name: Option<String>,
    ) -> Result<Arc<Session>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SessionError::InvalidUser("empty user id".to_string()));
        }

        let session = Arc::new(Session {
            user_id: user_id.to_string(),
            role,
            display_name,
            started_at: Utc::now(),
        });

        let previous = self.current.write().await.replace(Arc::clone(&session));
        if let Some(previous) = previous {
            debug!(user_id = %previous.user_id, "Replacing active session");
        }
        info!(user_id = %session.user_id, role = ?session.role, "Session started");

        Ok(session)
    }

    pub async fn current(&self) -> Option<Arc<Session>> {
        self.current.read().await.clone()
    }

    /// The active session, or `NotSignedIn`
    pub async fn require(&self) -> Result<Arc<Session>> {
        self.current().await.ok_or(SessionError::NotSignedIn)
    }

    /// End the active session, returning it
    pub async fn clear(&self) -> Option<Arc<Session>> {
        let previous = self.current.write().await.take();
        if let Some(ref session) = previous {
            info!(user_id = %session.user_id, "Session cleared");
        }
        previous
    }
}
