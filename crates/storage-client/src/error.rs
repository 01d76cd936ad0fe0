//! Error types for the storage client

use asset_mirror::StoreError;
use std::fmt;

#[derive(Debug)]
pub enum StorageError {
    Http(Box<reqwest::Error>),
    InvalidId(String),
    NotFound(String),
    /// Object exists but carries no download token
    NotShared(String),
    Status(u16),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Http(err) => write!(f, "HTTP error: {}", err),
            StorageError::InvalidId(msg) => write!(f, "Invalid object id: {}", msg),
            StorageError::NotFound(path) => write!(f, "Object not found: {}", path),
            StorageError::NotShared(path) => write!(f, "Object has no download token: {}", path),
            StorageError::Status(status) => write!(f, "Storage returned status {}", status),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(Box::new(err))
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidId(_) | StorageError::NotFound(_) | StorageError::NotShared(_) => {
                StoreError::NotFound(err.to_string())
            }
            StorageError::Http(_) | StorageError::Status(_) => StoreError::Transient(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
