//! Resolution of remote assets to local files

use crate::error::{MirrorError, Result};
use crate::fs::{LocalFs, TokioFs};
use crate::key::AssetKey;
use crate::store::ObjectStore;
use crate::types::{
    CacheEntry, EntryOrigin, EntryState, MirrorConfig, MirrorStats, Resolution, ResolveOptions,
};
use futures::channel::oneshot;
use futures::future::{join_all, FutureExt, Shared};
use moka::future::Cache;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Receives the final entry (ready or failed) of a running resolution
type InFlight = Shared<oneshot::Receiver<CacheEntry>>;

/// Mirrors remote objects into a local cache directory.
///
/// Cheap to clone; clones share the same cache state.
#[derive(Clone)]
pub struct RemoteAssetMirror {
    inner: Arc<MirrorInner>,
}

struct MirrorInner {
    cache_root: PathBuf,
    fetch_timeout: Duration,
    store: Arc<dyn ObjectStore>,
    fs: Arc<dyn LocalFs>,
    /// Entries known to be on disk, keyed by local path
    ready: Cache<PathBuf, CacheEntry>,
    /// At most one running resolution per local path
    in_flight: Mutex<HashMap<PathBuf, (CacheEntry, InFlight)>>,
    download_limit: Option<Semaphore>,
    /// Bumped after every eviction removes a file
    evictions: AtomicU64,
    hits: AtomicU64,
    reused: AtomicU64,
    downloads: AtomicU64,
    deduplicated: AtomicU64,
    failures: AtomicU64,
}

impl RemoteAssetMirror {
    pub fn new(config: MirrorConfig, store: Arc<dyn ObjectStore>, fs: Arc<dyn LocalFs>) -> Self {
        let ready = Cache::builder()
            .max_capacity(config.max_ready_entries)
            .build();

        info!(
            cache_root = ?config.cache_root,
            fetch_timeout = ?config.fetch_timeout,
            max_concurrent_downloads = ?config.max_concurrent_downloads,
            "Asset mirror initialized"
        );

        Self {
            inner: Arc::new(MirrorInner {
                cache_root: config.cache_root,
                fetch_timeout: config.fetch_timeout,
                store,
                fs,
                ready,
                in_flight: Mutex::new(HashMap::new()),
                download_limit: config
                    .max_concurrent_downloads
                    .map(|permits| Semaphore::new(permits.max(1))),
                evictions: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                reused: AtomicU64::new(0),
                downloads: AtomicU64::new(0),
                deduplicated: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    /// Mirror backed by local disk and plain HTTP downloads
    pub fn with_http(config: MirrorConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self::new(config, store, Arc::new(TokioFs::new()))
    }

    pub fn cache_root(&self) -> &Path {
        &self.inner.cache_root
    }

    /// Compute where `remote_id` is cached within `namespace`, without any I/O
    pub fn local_path(&self, remote_id: &str, namespace: &str) -> Result<PathBuf> {
        self.key_and_path(remote_id, namespace)
            .map(|(_, local_path)| local_path)
    }

    /// Resolve `remote_id` to a local file, downloading it on first use.
    ///
    /// Never fails: every error is logged and turned into `opts.fallback`.
    pub async fn resolve(&self, remote_id: &str, opts: &ResolveOptions) -> Resolution {
        let (key, local_path) = match self.key_and_path(remote_id, &opts.namespace) {
            Ok(pair) => pair,
            Err(err) => {
                debug!(remote_id, namespace = %opts.namespace, error = %err, "Skipping resolution");
                return Resolution::Fallback(opts.fallback.clone());
            }
        };

        if let Some(entry) = self.inner.ready.get(&local_path).await {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return Resolution::Local(entry.local_path);
        }

        let channel = self.spawn_resolution(remote_id, key, local_path);
        match channel.await {
            Ok(entry) if entry.state == EntryState::Ready => Resolution::Local(entry.local_path),
            Ok(_) => Resolution::Fallback(opts.fallback.clone()),
            Err(_canceled) => {
                warn!(remote_id, "Asset resolution task dropped before completing");
                Resolution::Fallback(opts.fallback.clone())
            }
        }
    }

    /// Resolve every id concurrently, preserving input order.
    ///
    /// Each element independently ends up local or as the fallback.
    pub async fn resolve_many<S: AsRef<str>>(
        &self,
        remote_ids: &[S],
        opts: &ResolveOptions,
    ) -> Vec<Resolution> {
        join_all(
            remote_ids
                .iter()
                .map(|remote_id| self.resolve(remote_id.as_ref(), opts)),
        )
        .await
    }

    /// Delete the cached file for `remote_id` and forget its ready entry.
    ///
    /// Evicting something that is not cached succeeds. A resolution of the
    /// same path that is still running re-checks the disk before its result
    /// is memoized, so it never leaves a ready entry for the removed file.
    pub async fn evict(&self, remote_id: &str, namespace: &str) -> Result<()> {
        let (key, local_path) = self.key_and_path(remote_id, namespace)?;

        self.inner.ready.invalidate(&local_path).await;
        let removed = self.inner.fs.remove_file(&local_path).await;
        self.inner.evictions.fetch_add(1, Ordering::SeqCst);
        // A resolution may have memoized between the first invalidate and the bump
        self.inner.ready.invalidate(&local_path).await;

        match removed {
            Ok(()) => {
                debug!(key = %key, path = ?local_path, "Evicted cached asset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(key = %key, path = ?local_path, error = %e, "Failed to evict cached asset");
                Err(MirrorError::filesystem(local_path, e))
            }
        }
    }

    /// Current state of the entry for `remote_id`, if the mirror knows about it
    pub async fn entry(&self, remote_id: &str, namespace: &str) -> Option<CacheEntry> {
        let (_, local_path) = self.key_and_path(remote_id, namespace).ok()?;

        if let Some(entry) = self.inner.ready.get(&local_path).await {
            return Some(entry);
        }

        self.inner
            .lock_in_flight()
            .get(&local_path)
            .map(|(pending, _)| pending.clone())
    }

    pub fn stats(&self) -> MirrorStats {
        let inner = &self.inner;
        MirrorStats {
            ready_entries: inner.ready.entry_count(),
            in_flight: inner.lock_in_flight().len(),
            hits: inner.hits.load(Ordering::Relaxed),
            reused: inner.reused.load(Ordering::Relaxed),
            downloads: inner.downloads.load(Ordering::Relaxed),
            deduplicated: inner.deduplicated.load(Ordering::Relaxed),
            failures: inner.failures.load(Ordering::Relaxed),
        }
    }

    fn key_and_path(&self, remote_id: &str, namespace: &str) -> Result<(AssetKey, PathBuf)> {
        validate_namespace(namespace)?;
        let key = AssetKey::from_remote_id(remote_id)?;
        let local_path = self.inner.cache_root.join(namespace).join(key.as_str());
        Ok((key, local_path))
    }

    /// Join the running resolution for `local_path`, or start one.
    ///
    /// The work runs on its own task, so a caller that stops waiting does not
    /// cancel it for the others.
    fn spawn_resolution(&self, remote_id: &str, key: AssetKey, local_path: PathBuf) -> InFlight {
        let mut in_flight = self.inner.lock_in_flight();

        if let Some((_, channel)) = in_flight.get(&local_path) {
            self.inner.deduplicated.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Joining in-flight resolution");
            return channel.clone();
        }

        let (sender, receiver) = oneshot::channel();
        let channel = receiver.shared();
        in_flight.insert(
            local_path.clone(),
            (CacheEntry::pending(&key, local_path.clone()), channel.clone()),
        );
        drop(in_flight);

        let inner = Arc::clone(&self.inner);
        let remote_id = remote_id.to_string();
        tokio::spawn(async move {
            let mut guard = InFlightGuard {
                inner: Arc::clone(&inner),
                local_path: local_path.clone(),
                completed: false,
            };
            let epoch = inner.evictions.load(Ordering::SeqCst);

            let entry = match inner.materialize(&remote_id, &key, &local_path).await {
                Ok(entry) => match inner.commit(entry, epoch).await {
                    Some(entry) => entry,
                    None => {
                        debug!(key = %key, "Asset evicted while resolving");
                        CacheEntry {
                            state: EntryState::Failed,
                            ..CacheEntry::pending(&key, local_path.clone())
                        }
                    }
                },
                Err(err) => {
                    inner.failures.fetch_add(1, Ordering::Relaxed);
                    log_failure(&remote_id, &key, &err);
                    CacheEntry {
                        state: EntryState::Failed,
                        ..CacheEntry::pending(&key, local_path.clone())
                    }
                }
            };

            // Unregister before waking waiters so a retry after failure starts fresh
            guard.completed = true;
            drop(guard);
            sender.send(entry).ok();
        });

        channel
    }
}

impl MirrorInner {
    /// Memoize a ready entry, unless an eviction since `epoch` removed its file
    async fn commit(&self, entry: CacheEntry, epoch: u64) -> Option<CacheEntry> {
        self.ready
            .insert(entry.local_path.clone(), entry.clone())
            .await;
        if self.evictions.load(Ordering::SeqCst) == epoch {
            return Some(entry);
        }

        match self.fs.exists(&entry.local_path).await {
            Ok(true) => Some(entry),
            _ => {
                self.ready.invalidate(&entry.local_path).await;
                None
            }
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, (CacheEntry, InFlight)>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure `local_path` holds the object, downloading it if needed
    async fn materialize(
        &self,
        remote_id: &str,
        key: &AssetKey,
        local_path: &Path,
    ) -> Result<CacheEntry> {
        let dir = local_path.parent().unwrap_or(self.cache_root.as_path());
        self.fs
            .create_dir_all(dir)
            .await
            .map_err(|e| MirrorError::filesystem(dir, e))?;

        let exists = self
            .fs
            .exists(local_path)
            .await
            .map_err(|e| MirrorError::filesystem(local_path, e))?;
        if exists {
            self.reused.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Reusing asset already on disk");
            return Ok(CacheEntry::ready(
                key,
                local_path.to_path_buf(),
                EntryOrigin::Reused,
            ));
        }

        let _permit = match &self.download_limit {
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        };

        let transfer = async {
            let url = self.store.fetch_url(remote_id).await?;
            self.fs.download(&url, local_path).await?;
            Ok::<(), MirrorError>(())
        };

        match tokio::time::timeout(self.fetch_timeout, transfer).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_elapsed) => return Err(MirrorError::Timeout(self.fetch_timeout)),
        }

        self.downloads.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, path = ?local_path, "Mirrored remote asset");
        Ok(CacheEntry::ready(
            key,
            local_path.to_path_buf(),
            EntryOrigin::Downloaded,
        ))
    }
}

/// Removes the in-flight marker when the resolution task ends, even by panic
struct InFlightGuard {
    inner: Arc<MirrorInner>,
    local_path: PathBuf,
    /// Unset when the task unwinds before producing an entry
    completed: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.inner.failures.fetch_add(1, Ordering::Relaxed);
            error!(path = ?self.local_path, "Asset resolution task ended without a result");
        }
        self.inner.lock_in_flight().remove(&self.local_path);
    }
}

fn validate_namespace(namespace: &str) -> Result<()> {
    let mut components = Path::new(namespace).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !namespace.contains(['/', '\\']) => Ok(()),
        _ => Err(MirrorError::InvalidInput(format!(
            "namespace must be a single directory name, got {:?}",
            namespace
        ))),
    }
}

fn log_failure(remote_id: &str, key: &AssetKey, err: &MirrorError) {
    match err {
        MirrorError::InvalidInput(_) => {
            debug!(remote_id, key = %key, error = %err, "Asset resolution skipped")
        }
        MirrorError::Filesystem { .. } => {
            error!(remote_id, key = %key, kind = err.kind(), error = %err, "Asset resolution failed")
        }
        MirrorError::Lookup(_) | MirrorError::Transfer(_) | MirrorError::Timeout(_) => {
            warn!(remote_id, key = %key, kind = err.kind(), error = %err, "Asset resolution failed")
        }
    }
}
