//! Data models for the sync core

mod conflict;
mod queue_item;
mod record;
mod status;

pub use conflict::{diff_fields, ConflictItem};
pub use queue_item::{SyncAction, SyncQueueItem};
pub use record::{entity_id, payload_version, OfflineRecord};
pub use status::SyncStatus;

/// Current wall-clock time in unix milliseconds
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
