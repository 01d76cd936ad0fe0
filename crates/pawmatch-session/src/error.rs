//! Error types for sessions

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotSignedIn,
    InvalidUser(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotSignedIn => write!(f, "No active session"),
            SessionError::InvalidUser(msg) => write!(f, "Invalid user: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

pub type Result<T> = std::result::Result<T, SessionError>;
