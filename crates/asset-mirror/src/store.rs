//! Remote object store seam

use async_trait::async_trait;
use std::fmt;

/// Hands out time-limited fetch URLs for remote objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve `remote_id` to a URL the object can be downloaded from
    async fn fetch_url(&self, remote_id: &str) -> Result<String, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist (or is no longer fetchable)
    NotFound(String),
    /// Network trouble or an unexpected response; a later attempt may succeed
    Transient(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Object not found: {}", id),
            StoreError::Transient(msg) => write!(f, "Transient store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
