//! PawMatch session and subscriptions
//!
//! An explicit, caller-owned session object replaces a process-wide session
//! singleton, and query results arrive as whole snapshots through cancellable
//! subscription handles.

pub mod error;
pub mod session;
pub mod subscription;
pub mod types;

pub use error::{Result, SessionError};
pub use session::SessionStore;
pub use subscription::{Snapshot, SnapshotFeed, Subscription};
pub use types::{Session, UserRole};
