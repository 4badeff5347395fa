//! Mutation queue item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::entity_id;

/// The kind of mutation queued for the remote authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    /// Stable string form used for persistence and item ids
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown sync action: {other}"
            ))),
        }
    }
}

/// One not-yet-synced local mutation.
///
/// Item ids are deterministic (collection, entity, action, enqueue time) but
/// intentionally not unique per entity: several queued mutations may target
/// the same entity, and their enqueue order is what the snapshot preserves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Deterministic item id
    pub id: String,
    /// Mutation kind
    pub action: SyncAction,
    /// Target collection
    pub collection: String,
    /// Payload snapshot taken at enqueue time
    pub payload: Value,
    /// Enqueue timestamp (unix ms)
    pub enqueued_at: i64,
    /// Failed sync attempts so far
    pub retry_count: u32,
    /// Message from the most recent failed attempt
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Create a queue item for the given mutation, stamped with the enqueue time
    #[must_use]
    pub fn new(
        action: SyncAction,
        collection: &str,
        entity: &str,
        payload: Value,
        enqueued_at: i64,
    ) -> Self {
        let id = format!("{collection}:{entity}:{action}:{enqueued_at}");
        Self {
            id,
            action,
            collection: collection.to_string(),
            payload,
            enqueued_at,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Entity id this mutation targets, read from the payload snapshot
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        entity_id(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_round_trip() {
        for action in [SyncAction::Create, SyncAction::Update, SyncAction::Delete] {
            let parsed: SyncAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert!("upsert".parse::<SyncAction>().is_err());
    }

    #[test]
    fn test_deterministic_id() {
        let a = SyncQueueItem::new(
            SyncAction::Update,
            "students",
            "s1",
            json!({"id": "s1"}),
            1_700_000_000_000,
        );
        let b = SyncQueueItem::new(
            SyncAction::Update,
            "students",
            "s1",
            json!({"id": "s1"}),
            1_700_000_000_000,
        );
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "students:s1:update:1700000000000");
    }

    #[test]
    fn test_distinct_enqueue_times_distinct_ids() {
        let a = SyncQueueItem::new(SyncAction::Update, "students", "s1", json!({"id": "s1"}), 1);
        let b = SyncQueueItem::new(SyncAction::Update, "students", "s1", json!({"id": "s1"}), 2);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_entity_id_from_payload() {
        let item = SyncQueueItem::new(
            SyncAction::Create,
            "students",
            "s1",
            json!({"id": "s1", "name": "A"}),
            1,
        );
        assert_eq!(item.entity_id(), Some("s1"));
    }
}
