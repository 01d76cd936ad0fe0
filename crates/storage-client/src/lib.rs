//! Blob Storage Client
//!
//! Looks up object metadata in a hosted blob store and turns it into
//! time-limited, token-bearing download URLs. Accepts bare object paths,
//! `gs://` references, and previously issued download URLs as identifiers.

pub mod client;
pub mod error;
pub mod types;

pub use client::StorageClient;
pub use error::{Result, StorageError};
pub use types::ObjectMetadata;
