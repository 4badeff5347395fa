//! Remote API boundary consumed by the sync engine

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Authoritative state attached to a conflict rejection
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictDetails {
    /// The remote's current payload for the entity
    pub server_payload: Value,
    /// Server-side timestamp of that payload (unix ms)
    pub server_timestamp: i64,
    /// Field names the remote reports as diverging (may be empty)
    pub conflicting_fields: Vec<String>,
}

/// Failure modes of a remote operation.
///
/// Transient failures are retried up to the engine's retry budget; conflicts
/// carry the remote's authoritative payload and are routed to the conflict
/// store once the budget is exhausted.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Network or server fault worth retrying
    #[error("Transient remote error: {0}")]
    Transient(String),

    /// Version mismatch rejected by the remote
    #[error("Version conflict: remote holds a newer copy")]
    Conflict(ConflictDetails),
}

/// Result type for remote operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Client for the remote authority.
///
/// Implementations own their transport concerns (timeouts included); the
/// engine only classifies the errors they return.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create an entity; returns the canonical payload (with server version)
    async fn create(&self, collection: &str, payload: &Value) -> RemoteResult<Value>;

    /// Update an entity; returns the canonical payload (with server version)
    async fn update(&self, collection: &str, id: &str, payload: &Value) -> RemoteResult<Value>;

    /// Delete an entity
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()>;
}
