//! satchel-core - Offline-first sync core for Satchel clients
//!
//! Maintains a durable local replica of server-owned entities, queues local
//! mutations performed while disconnected, and reconciles the queue against
//! the remote authority when connectivity returns. Conflicts are detected
//! and surfaced for explicit resolution - never merged silently.
//!
//! The entry point is [`SyncEngine`], constructed from a [`DurableStore`]
//! and a [`RemoteApi`] client and owned by the application root.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod status;
pub mod store;

pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use models::{ConflictItem, OfflineRecord, SyncAction, SyncQueueItem, SyncStatus};
pub use remote::{ConflictDetails, RemoteApi, RemoteError, RemoteResult};
pub use status::StatusBroadcaster;
pub use store::{DurableStore, SqliteStore};
