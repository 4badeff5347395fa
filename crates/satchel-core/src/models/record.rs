//! Offline replica record model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A locally replicated copy of a server-owned entity.
///
/// Exactly one record exists per (collection, id) pair; the durable store
/// enforces this with an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineRecord {
    /// Entity identifier (server-assigned or client-chosen at create time)
    pub id: String,
    /// Collection the entity belongs to (e.g. "students")
    pub collection: String,
    /// Full entity payload as JSON
    pub payload: Value,
    /// Last local modification timestamp (unix ms)
    pub last_modified: i64,
    /// Entity version as known locally
    pub version: i64,
    /// Whether this record carries local changes not yet acknowledged remotely
    pub needs_sync: bool,
}

impl OfflineRecord {
    /// Build a record from a local mutation payload, marked as needing sync.
    ///
    /// The version is taken from the payload when present, otherwise zero.
    pub fn from_local(collection: &str, payload: Value, last_modified: i64) -> crate::Result<Self> {
        let id = require_entity_id(&payload)?;
        let version = payload_version(&payload).unwrap_or(0);
        Ok(Self {
            id,
            collection: collection.to_string(),
            payload,
            last_modified,
            version,
            needs_sync: true,
        })
    }

    /// Build a record from an authoritative server payload.
    ///
    /// The returned record adopts the server version and is marked clean.
    pub fn from_server(
        collection: &str,
        payload: Value,
        last_modified: i64,
    ) -> crate::Result<Self> {
        let id = require_entity_id(&payload)?;
        let version = payload_version(&payload).unwrap_or(0);
        Ok(Self {
            id,
            collection: collection.to_string(),
            payload,
            last_modified,
            version,
            needs_sync: false,
        })
    }
}

fn require_entity_id(payload: &Value) -> crate::Result<String> {
    entity_id(payload).map(ToString::to_string).ok_or_else(|| {
        crate::Error::InvalidInput("payload must carry a string \"id\" field".to_string())
    })
}

/// Extract the entity id from a mutation payload
#[must_use]
pub fn entity_id(payload: &Value) -> Option<&str> {
    payload.get("id").and_then(Value::as_str)
}

/// Extract the entity version from a payload, when the remote supplied one
#[must_use]
pub fn payload_version(payload: &Value) -> Option<i64> {
    payload.get("version").and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_local_marks_dirty() {
        let record =
            OfflineRecord::from_local("students", json!({"id": "s1", "name": "A"}), 100).unwrap();
        assert_eq!(record.id, "s1");
        assert_eq!(record.collection, "students");
        assert_eq!(record.version, 0);
        assert!(record.needs_sync);
    }

    #[test]
    fn test_from_server_adopts_version() {
        let record =
            OfflineRecord::from_server("students", json!({"id": "s1", "version": 4}), 100).unwrap();
        assert_eq!(record.version, 4);
        assert!(!record.needs_sync);
    }

    #[test]
    fn test_missing_id_rejected() {
        let result = OfflineRecord::from_local("students", json!({"name": "A"}), 100);
        assert!(result.is_err());
    }

    #[test]
    fn test_entity_id_requires_string() {
        assert_eq!(entity_id(&json!({"id": "s1"})), Some("s1"));
        assert_eq!(entity_id(&json!({"id": 7})), None);
        assert_eq!(entity_id(&json!({})), None);
    }
}
