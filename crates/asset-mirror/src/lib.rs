//! Remote asset mirror
//!
//! Resolves remote blob-store identifiers to files on local storage. The first
//! request for an asset downloads it into a per-namespace cache directory, later
//! requests reuse the local copy, and concurrent requests for the same asset
//! share a single download. Every failure degrades to a caller-supplied
//! fallback instead of an error.

mod error;
mod fs;
mod key;
mod mirror;
mod store;
mod types;

pub use error::{DownloadError, MirrorError, Result};
pub use fs::{LocalFs, TokioFs};
pub use key::AssetKey;
pub use mirror::RemoteAssetMirror;
pub use store::{ObjectStore, StoreError};
pub use types::{
    CacheEntry, EntryOrigin, EntryState, MirrorConfig, MirrorStats, Resolution, ResolveOptions,
};
