//! Mirror types

use crate::key::AssetKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-request resolution options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Cache subdirectory, e.g. "animals" or "adopter_images"
    pub namespace: String,
    /// Returned verbatim whenever resolution cannot produce a local file
    pub fallback: String,
}

impl ResolveOptions {
    pub fn new(namespace: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            fallback: fallback.into(),
        }
    }
}

/// Outcome of a resolution: a local file or the caller's fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Local(PathBuf),
    Fallback(String),
}

impl Resolution {
    pub fn is_local(&self) -> bool {
        matches!(self, Resolution::Local(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Resolution::Local(path) => Some(path),
            Resolution::Fallback(_) => None,
        }
    }

    /// Either the local path rendered as a string or the fallback value
    pub fn into_string(self) -> String {
        match self {
            Resolution::Local(path) => path.to_string_lossy().into_owned(),
            Resolution::Fallback(fallback) => fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Pending,
    Ready,
    Failed,
}

/// How a ready entry came to be on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    /// The file was already present when the entry was resolved
    Reused,
    Downloaded,
}

/// State of one cached asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub local_path: PathBuf,
    pub state: EntryState,
    pub origin: Option<EntryOrigin>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    pub(crate) fn pending(key: &AssetKey, local_path: PathBuf) -> Self {
        Self {
            key: key.to_string(),
            local_path,
            state: EntryState::Pending,
            origin: None,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn ready(key: &AssetKey, local_path: PathBuf, origin: EntryOrigin) -> Self {
        Self {
            key: key.to_string(),
            local_path,
            state: EntryState::Ready,
            origin: Some(origin),
            updated_at: Utc::now(),
        }
    }
}

/// Configuration for a [`RemoteAssetMirror`](crate::RemoteAssetMirror)
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root under which one directory per namespace is created
    pub cache_root: PathBuf,
    /// Upper bound on store lookup plus download for one asset
    pub fetch_timeout: Duration,
    /// Maximum simultaneous downloads; `None` leaves them unbounded
    pub max_concurrent_downloads: Option<usize>,
    /// Capacity of the in-memory ready memo
    pub max_ready_entries: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("./cache/assets"),
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_downloads: None,
            max_ready_entries: 10_000,
        }
    }
}

/// Statistics about the mirror
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorStats {
    pub ready_entries: u64,
    pub in_flight: usize,
    /// Resolutions answered from the ready memo
    pub hits: u64,
    /// Files found on disk without downloading
    pub reused: u64,
    pub downloads: u64,
    /// Callers that joined an already running resolution
    pub deduplicated: u64,
    pub failures: u64,
}
