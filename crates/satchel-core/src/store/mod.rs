//! Durable local storage for replica records and the mutation queue

mod migrations;
mod sqlite;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::{OfflineRecord, SyncQueueItem};

/// Trait for the durable local store backing the replica and the queue.
///
/// Implementations must survive process restart. Upserts are atomic per
/// record; no cross-collection transactions are required.
pub trait DurableStore: Send {
    /// Get a replica record by collection and entity id
    fn get(&self, collection: &str, id: &str) -> Result<Option<OfflineRecord>>;

    /// Get all replica records in a collection
    fn get_all(&self, collection: &str) -> Result<Vec<OfflineRecord>>;

    /// Upsert a replica record (exactly one row per collection + id)
    fn put(&self, record: &OfflineRecord) -> Result<()>;

    /// Delete a replica record; deleting a missing record is a no-op
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Upsert a mutation queue row, preserving its original queue position
    fn queue_put(&self, item: &SyncQueueItem) -> Result<()>;

    /// Remove a mutation queue row
    fn queue_remove(&self, id: &str) -> Result<()>;

    /// All queued mutations in enqueue order
    fn queue_all(&self) -> Result<Vec<SyncQueueItem>>;

    /// Number of queued mutations
    fn queue_len(&self) -> Result<usize>;
}

/// Store handle shared between the engine, the queue, and spawned tasks
pub type SharedStore = Arc<Mutex<dyn DurableStore>>;

/// Wrap a store implementation into a shareable handle
pub fn shared(store: impl DurableStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}
