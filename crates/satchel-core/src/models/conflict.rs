//! Conflict model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unresolved version conflict awaiting explicit caller resolution.
///
/// Created only when a queue item exhausts its retry budget with a
/// conflict-classified failure; removed only by one of the resolve calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictItem {
    /// Entity id the conflict is about
    pub id: String,
    /// Collection the entity belongs to
    pub collection: String,
    /// Payload of the rejected local mutation
    pub local_payload: Value,
    /// Authoritative payload supplied by the remote
    pub server_payload: Value,
    /// Local mutation timestamp (unix ms)
    pub local_timestamp: i64,
    /// Server-side timestamp of the authoritative payload (unix ms)
    pub server_timestamp: i64,
    /// Field names that differ between the two payloads
    pub conflicting_fields: Vec<String>,
}

/// Compute the top-level fields that differ between two payloads.
///
/// Used as a fallback when the remote reports a conflict without naming the
/// diverging fields. Non-object payloads are reported as a whole-payload
/// difference.
#[must_use]
pub fn diff_fields(local: &Value, server: &Value) -> Vec<String> {
    let (Some(local), Some(server)) = (local.as_object(), server.as_object()) else {
        return if local == server {
            Vec::new()
        } else {
            vec!["payload".to_string()]
        };
    };

    let mut fields: Vec<String> = local
        .iter()
        .filter(|(key, value)| server.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    for key in server.keys() {
        if !local.contains_key(key) {
            fields.push(key.clone());
        }
    }
    fields.sort();
    fields.dedup();
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_fields_reports_changed_and_missing() {
        let local = json!({"id": "s1", "name": "B", "grade": 5});
        let server = json!({"id": "s1", "name": "C", "room": "2a"});
        assert_eq!(diff_fields(&local, &server), vec!["grade", "name", "room"]);
    }

    #[test]
    fn test_diff_fields_equal_payloads() {
        let payload = json!({"id": "s1", "name": "A"});
        assert!(diff_fields(&payload, &payload.clone()).is_empty());
    }

    #[test]
    fn test_diff_fields_non_object() {
        assert_eq!(
            diff_fields(&json!("a"), &json!("b")),
            vec!["payload".to_string()]
        );
    }
}
