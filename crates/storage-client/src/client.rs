//! Metadata lookup and download URL construction

use crate::error::{Result, StorageError};
use crate::types::ObjectMetadata;
use asset_mirror::{ObjectStore, StoreError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://firebasestorage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the blob store's REST API
pub struct StorageClient {
    client: Client,
    base_url: String,
    bucket: String,
}

impl StorageClient {
    /// Create a client for `bucket` on the default storage host
    pub fn new(bucket: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, bucket)
    }

    /// Create a client against a custom storage host
    pub fn with_base_url(base_url: &str, bucket: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Extract the object path from a bare path, a `gs://` reference or a
    /// download URL issued by this store
    pub fn object_path(&self, remote_id: &str) -> Result<String> {
        let trimmed = remote_id.trim();

        let path = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| StorageError::InvalidId(format!("{}: {}", trimmed, e)))?;
            let (_, escaped) = url.path().split_once("/o/").ok_or_else(|| {
                StorageError::InvalidId(format!("not a storage object URL: {}", trimmed))
            })?;
            urlencoding::decode(escaped)
                .map_err(|e| StorageError::InvalidId(format!("{}: {}", trimmed, e)))?
                .into_owned()
        } else if let Some(rest) = trimmed.strip_prefix("gs://") {
            // gs://<bucket>/<path>
            rest.split_once('/')
                .map(|(_, path)| path.to_string())
                .unwrap_or_default()
        } else {
            trimmed.trim_start_matches('/').to_string()
        };

        if path.is_empty() {
            return Err(StorageError::InvalidId(format!(
                "no object path in {:?}",
                remote_id
            )));
        }

        Ok(path)
    }

    /// Metadata endpoint for an object path
    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(path)
        )
    }

    /// Build the media URL for an object using one of its download tokens
    pub fn download_url(&self, path: &str, token: &str) -> String {
        format!(
            "{}?alt=media&token={}",
            self.object_url(path),
            urlencoding::encode(token)
        )
    }

    /// Fetch metadata for an object path
    pub async fn metadata(&self, path: &str) -> Result<ObjectMetadata> {
        let url = self.object_url(path);
        debug!(url = %url, "Fetching object metadata");

        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(path.to_string())),
            status if !status.is_success() => {
                return Err(StorageError::Status(status.as_u16()));
            }
            _ => {}
        }

        let meta: ObjectMetadata = response.json().await?;
        Ok(meta)
    }

    /// Resolve any accepted identifier to a token-bearing download URL
    pub async fn resolve_download_url(&self, remote_id: &str) -> Result<String> {
        let path = self.object_path(remote_id)?;
        let meta = self.metadata(&path).await?;

        let token = meta
            .first_token()
            .ok_or_else(|| StorageError::NotShared(path.clone()))?;

        let url = self.download_url(&path, token);
        debug!(path = %path, size = ?meta.size_bytes(), "Resolved download URL");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn fetch_url(&self, remote_id: &str) -> std::result::Result<String, StoreError> {
        self.resolve_download_url(remote_id)
            .await
            .map_err(StoreError::from)
    }
}
