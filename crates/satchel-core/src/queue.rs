//! Persisted mutation queue

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{entity_id, now_ms, SyncAction, SyncQueueItem};
use crate::store::SharedStore;

/// Ordered log of not-yet-synced mutations, backed by the durable store.
///
/// Enqueueing never touches the network; the engine layers opportunistic
/// sync on top. Items are not deduplicated per entity - several mutations
/// for the same entity coexist, in enqueue order.
#[derive(Clone)]
pub struct MutationQueue {
    store: SharedStore,
    last_enqueued_at: Arc<AtomicI64>,
}

impl MutationQueue {
    /// Create a queue over the given store handle
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            last_enqueued_at: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Strictly monotonic enqueue timestamp, so same-millisecond mutations
    /// for one entity still get distinct item ids and a stable order
    fn next_enqueued_at(&self) -> i64 {
        let now = now_ms();
        self.last_enqueued_at
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .map_or(now, |last| now.max(last + 1))
    }

    /// Append a mutation to the queue.
    ///
    /// The payload must carry a string `id` field naming the target entity;
    /// the item id is derived deterministically from collection, entity,
    /// action, and enqueue time.
    pub async fn enqueue(
        &self,
        action: SyncAction,
        collection: &str,
        payload: Value,
    ) -> Result<SyncQueueItem> {
        let entity = entity_id(&payload)
            .ok_or_else(|| {
                Error::InvalidInput("payload must carry a string \"id\" field".to_string())
            })?
            .to_string();

        let item = SyncQueueItem::new(action, collection, &entity, payload, self.next_enqueued_at());
        self.store.lock().await.queue_put(&item)?;
        tracing::debug!(
            "enqueued {} for {}/{} as {}",
            item.action,
            item.collection,
            entity,
            item.id
        );

        Ok(item)
    }

    /// Snapshot the queue in enqueue order
    pub async fn snapshot(&self) -> Result<Vec<SyncQueueItem>> {
        self.store.lock().await.queue_all()
    }

    /// Persist updated retry state for an item, keeping its queue position
    pub async fn persist(&self, item: &SyncQueueItem) -> Result<()> {
        self.store.lock().await.queue_put(item)
    }

    /// Remove an item after terminal success or terminal failure
    pub async fn dequeue(&self, id: &str) -> Result<()> {
        self.store.lock().await.queue_remove(id)
    }

    /// Number of pending items
    pub async fn len(&self) -> Result<usize> {
        self.store.lock().await.queue_len()
    }

    /// Whether the queue is empty
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
