//! Sync status snapshot

use serde::{Deserialize, Serialize};

use super::conflict::ConflictItem;

/// Point-in-time view of the sync engine, recomputed on every change and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether a sync pass is currently running
    pub is_syncing: bool,
    /// Completion time of the most recent pass (unix ms)
    pub last_sync_time: Option<i64>,
    /// Queue items awaiting sync
    pub pending_count: usize,
    /// Unresolved conflicts
    pub conflicts: Vec<ConflictItem>,
    /// Messages from terminally failed items; cleared by the next fully
    /// successful pass
    pub errors: Vec<String>,
}
