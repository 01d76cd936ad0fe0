//! Snapshot subscriptions
//!
//! A [`SnapshotFeed`] carries the full result set of one query. Each publish
//! replaces the previous snapshot wholesale; subscribers never see patches,
//! and a slow subscriber may skip intermediate snapshots but always ends up
//! on the latest one.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Full state of a query at one point in time
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Starts at 1 and increases by one per publish
    pub version: u64,
    pub items: Arc<Vec<T>>,
    pub published_at: DateTime<Utc>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: Arc::clone(&self.items),
            published_at: self.published_at,
        }
    }
}

/// Publisher side of a query's snapshots
pub struct SnapshotFeed<T> {
    sender: watch::Sender<Option<Snapshot<T>>>,
}

impl<T: Send + Sync + 'static> SnapshotFeed<T> {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Replace the current snapshot, returning its version
    pub fn publish(&self, items: Vec<T>) -> u64 {
        let mut version = 0;
        self.sender.send_modify(|current| {
            version = current.as_ref().map_or(1, |snapshot| snapshot.version + 1);
            *current = Some(Snapshot {
                version,
                items: Arc::new(items),
                published_at: Utc::now(),
            });
        });
        debug!(version, subscribers = self.sender.receiver_count(), "Published snapshot");
        version
    }

    pub fn latest(&self) -> Option<Snapshot<T>> {
        self.sender.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Call `on_change` with every new snapshot until the handle is dropped or
    /// unsubscribed. If a snapshot was already published, `on_change` receives
    /// it first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(Snapshot<T>) + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();
        receiver.mark_changed();

        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let snapshot = receiver.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    on_change(snapshot);
                }
            }
            debug!("Snapshot feed closed");
        });

        Subscription { task }
    }
}

impl<T: Send + Sync + 'static> Default for SnapshotFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running subscription; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// False once unsubscribed or once the feed has been dropped
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
