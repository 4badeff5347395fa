//! Status broadcasting to subscribers

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::SyncStatus;

/// Publishes `SyncStatus` snapshots to any number of subscribers.
///
/// Built on a watch channel: `subscribe` hands out a receiver that observes
/// every published snapshot, and dropping the receiver is the unsubscribe.
#[derive(Clone)]
pub struct StatusBroadcaster {
    tx: Arc<watch::Sender<SyncStatus>>,
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBroadcaster {
    /// Create a broadcaster holding a default (idle, empty) status
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new snapshot to all current subscribers
    pub fn publish(&self, status: SyncStatus) {
        // send_replace stores the snapshot even with no receivers alive,
        // so late subscribers still see the latest state
        self.tx.send_replace(status);
    }

    /// Subscribe to status changes; drop the receiver to unsubscribe
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// The most recently published snapshot
    #[must_use]
    pub fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_subscribers_observe_published_status() {
        let broadcaster = StatusBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let status = SyncStatus {
            pending_count: 2,
            ..SyncStatus::default()
        };
        broadcaster.publish(status.clone());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), status);
        assert_eq!(broadcaster.current(), status);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_without_subscribers_is_retained() {
        let broadcaster = StatusBroadcaster::new();
        broadcaster.publish(SyncStatus {
            pending_count: 1,
            ..SyncStatus::default()
        });

        // A late subscriber still sees the latest snapshot
        let rx = broadcaster.subscribe();
        assert_eq!(rx.borrow().pending_count, 1);
    }
}
