//! Core types for the PawMatch media proxy

use asset_mirror::{MirrorStats, Resolution};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the media proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub cache_dir: PathBuf,
    pub storage_base_url: String,
    pub storage_bucket: String,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_downloads: Option<usize>,
    pub max_ready_entries: u64,
    /// Served when a request names no fallback of its own
    pub default_fallback: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cache_dir: PathBuf::from("./cache/assets"),
            storage_base_url: "https://firebasestorage.googleapis.com".to_string(),
            storage_bucket: String::new(),
            fetch_timeout_secs: 30,
            max_concurrent_downloads: None,
            max_ready_entries: 10_000,
            default_fallback: "placeholder.png".to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub mirror: MirrorStats,
}

/// Query string of the single-asset endpoints
#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    #[serde(default)]
    pub id: String,
    pub fallback: Option<String>,
}

/// Body of the batch endpoint
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
    pub fallback: Option<String>,
}

/// One element of the batch response, in request order
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl BatchItem {
    pub fn new(id: String, resolution: Resolution) -> Self {
        match resolution {
            Resolution::Local(path) => Self {
                id,
                path: Some(path.to_string_lossy().into_owned()),
                fallback: None,
            },
            Resolution::Fallback(fallback) => Self {
                id,
                path: None,
                fallback: Some(fallback),
            },
        }
    }
}
