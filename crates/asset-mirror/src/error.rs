//! Error types for the asset mirror

use crate::store::StoreError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why a single resolution could not produce a local file
#[derive(Debug)]
pub enum MirrorError {
    /// Empty identifier or unusable namespace; no I/O was attempted
    InvalidInput(String),
    /// The object store could not hand out a fetch URL
    Lookup(StoreError),
    /// The transfer started but did not complete
    Transfer(DownloadError),
    /// Lookup plus transfer exceeded the configured fetch timeout
    Timeout(Duration),
    /// Directory creation, existence check or deletion failed
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MirrorError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Short label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            MirrorError::InvalidInput(_) => "invalid_input",
            MirrorError::Lookup(_) => "lookup",
            MirrorError::Transfer(_) => "transfer",
            MirrorError::Timeout(_) => "timeout",
            MirrorError::Filesystem { .. } => "filesystem",
        }
    }
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            MirrorError::Lookup(err) => write!(f, "Lookup failed: {}", err),
            MirrorError::Transfer(err) => write!(f, "Transfer failed: {}", err),
            MirrorError::Timeout(limit) => write!(f, "Fetch timed out after {:?}", limit),
            MirrorError::Filesystem { path, source } => {
                write!(f, "Filesystem error at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MirrorError::Lookup(err) => Some(err),
            MirrorError::Transfer(err) => Some(err),
            MirrorError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for MirrorError {
    fn from(err: StoreError) -> Self {
        MirrorError::Lookup(err)
    }
}

impl From<DownloadError> for MirrorError {
    fn from(err: DownloadError) -> Self {
        MirrorError::Transfer(err)
    }
}

/// Failure while copying a fetch URL's body to local storage
#[derive(Debug)]
pub enum DownloadError {
    Http(Box<reqwest::Error>),
    Status(u16),
    Io(std::io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Http(err) => write!(f, "HTTP error: {}", err),
            DownloadError::Status(status) => write!(f, "Server returned status {}", status),
            DownloadError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::Http(err) => Some(err.as_ref()),
            DownloadError::Io(err) => Some(err),
            DownloadError::Status(_) => None,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
