//! Local filesystem seam and its tokio/reqwest implementation

use crate::error::DownloadError;
use async_trait::async_trait;
use reqwest::Client;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Filesystem operations the mirror needs
#[async_trait]
pub trait LocalFs: Send + Sync {
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Create `path` and any missing parents; succeeds if it already exists
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy the body behind `url` to `dest`, returning the number of bytes
    /// written. Nothing may be left at `dest` unless the transfer completed.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Local disk via `tokio::fs`, downloads via `reqwest`
pub struct TokioFs {
    client: Client,
}

impl TokioFs {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Use a preconfigured client (proxy settings, user agent, ...)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for TokioFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalFs for TokioFs {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        fs::try_exists(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status().as_u16()));
        }

        // Stage next to the destination so the final rename stays on one filesystem
        let dir = dest
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let staged = blocking(move || {
            tempfile::Builder::new()
                .prefix(".partial-")
                .tempfile_in(dir)
        })
        .await?;
        let mut file = fs::File::from_std(staged.reopen()?);

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let target = dest.to_path_buf();
        blocking(move || staged.persist(target).map(drop).map_err(|e| e.error)).await?;

        debug!(url = %url, dest = ?dest, size = written, "Downloaded asset");
        Ok(written)
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}

/// Run a blocking filesystem call off the async workers, like `tokio::fs` does
async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_exists_and_remove() {
        let dir = tempdir().unwrap();
        let fs_impl = TokioFs::new();
        let path = dir.path().join("cat.jpg");

        assert!(!fs_impl.exists(&path).await.unwrap());
        tokio::fs::write(&path, b"meow").await.unwrap();
        assert!(fs_impl.exists(&path).await.unwrap());

        fs_impl.remove_file(&path).await.unwrap();
        assert!(!fs_impl.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_dir_all_is_idempotent() {
        let dir = tempdir().unwrap();
        let fs_impl = TokioFs::new();
        let nested = dir.path().join("animals").join("thumbs");

        fs_impl.create_dir_all(&nested).await.unwrap();
        fs_impl.create_dir_all(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    /// Serve `/cat.jpg`, a `/stalled.jpg` that sends one chunk and then hangs,
    /// and a 404 for everything else on an ephemeral port
    async fn spawn_origin() -> String {
        use axum::{body::Body, http::StatusCode, routing::get, Router};
        use futures::stream::{self, StreamExt};

        let router = Router::new()
            .route("/cat.jpg", get(|| async { b"not really a jpeg".to_vec() }))
            .route(
                "/stalled.jpg",
                get(|| async {
                    let first = stream::iter([Ok::<_, io::Error>("half a jp")]);
                    Body::from_stream(first.chain(stream::pending()))
                }),
            )
            .fallback(|| async { StatusCode::NOT_FOUND });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_download_writes_complete_file() {
        let dir = tempdir().unwrap();
        let origin = spawn_origin().await;
        let fs_impl = TokioFs::new();
        let dest = dir.path().join("cat.jpg");

        let size = fs_impl
            .download(&format!("{}/cat.jpg", origin), &dest)
            .await
            .unwrap();

        assert_eq!(size, 17);
        assert_eq!(std::fs::read(&dest).unwrap(), b"not really a jpeg");
        // Only the final file remains, no staging leftovers
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let dir = tempdir().unwrap();
        let origin = spawn_origin().await;
        let fs_impl = TokioFs::new();
        let dest = dir.path().join("gone.jpg");

        let result = fs_impl
            .download(&format!("{}/gone.jpg", origin), &dest)
            .await;

        assert!(matches!(result, Err(DownloadError::Status(404))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let dir = tempdir().unwrap();
        let fs_impl = TokioFs::new();
        let dest = dir.path().join("cat.jpg");

        // Nothing listens on port 9 locally
        let result = fs_impl.download("http://127.0.0.1:9/cat.jpg", &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_interrupted_transfer_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let origin = spawn_origin().await;
        let fs_impl = TokioFs::new();
        let dest = dir.path().join("stalled.jpg");

        let result = tokio::time::timeout(
            Duration::from_millis(500),
            fs_impl.download(&format!("{}/stalled.jpg", origin), &dest),
        )
        .await;
        assert!(result.is_err(), "transfer should still be stuck on the stalled body");

        // Neither the destination nor a staged partial file survives
        assert!(!dest.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "leftover files: {:?}", leftovers);
    }
}
