//! PawMatch Media Proxy - local front end for the asset mirror
//!
//! Mirrors listing and profile images from the hosted blob store onto local
//! disk and serves them to the app, falling back to placeholders on failure.

mod error;
mod server;
mod types;

use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::types::ProxyConfig;
use asset_mirror::{MirrorConfig, RemoteAssetMirror};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage_client::StorageClient;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("pawmatch_media_proxy=info".parse()?)
        .add_directive("asset_mirror=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting PawMatch Media Proxy...");

    // Load configuration from environment
    let config = load_config()?;
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Storage bucket: {}", config.storage_bucket);
    info!("Fetch timeout: {} seconds", config.fetch_timeout_secs);

    tokio::fs::create_dir_all(&config.cache_dir).await?;

    let store = StorageClient::with_base_url(&config.storage_base_url, &config.storage_bucket)?;
    let mirror = RemoteAssetMirror::with_http(
        MirrorConfig {
            cache_root: config.cache_dir,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_concurrent_downloads: config.max_concurrent_downloads,
            max_ready_entries: config.max_ready_entries,
        },
        Arc::new(store),
    );

    // Create shared state
    let state: SharedState = Arc::new(ServerState::new(mirror, config.default_fallback));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

fn load_config() -> Result<ProxyConfig> {
    let defaults = ProxyConfig::default();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(defaults.port);

    let cache_dir = std::env::var("CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.cache_dir);

    let storage_base_url =
        std::env::var("STORAGE_BASE_URL").unwrap_or(defaults.storage_base_url);

    let storage_bucket = std::env::var("STORAGE_BUCKET")
        .ok()
        .filter(|bucket| !bucket.trim().is_empty())
        .ok_or_else(|| ProxyError::Config("STORAGE_BUCKET is not set".to_string()))?;

    let fetch_timeout_secs = std::env::var("FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.fetch_timeout_secs);

    // Unset means unbounded
    let max_concurrent_downloads = std::env::var("MAX_CONCURRENT_DOWNLOADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok());

    let max_ready_entries = std::env::var("MAX_READY_ENTRIES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.max_ready_entries);

    let default_fallback =
        std::env::var("DEFAULT_FALLBACK").unwrap_or(defaults.default_fallback);

    Ok(ProxyConfig {
        port,
        cache_dir,
        storage_base_url,
        storage_bucket,
        fetch_timeout_secs,
        max_concurrent_downloads,
        max_ready_entries,
        default_fallback,
    })
}
