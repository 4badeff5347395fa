//! SQLite implementation of the durable store

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde_json::Value;

use super::{migrations, DurableStore};
use crate::error::Result;
use crate::models::{OfflineRecord, SyncAction, SyncQueueItem};

/// `SQLite`-backed durable store.
///
/// One logical collection per entity type lives in the `records` table; the
/// mutation queue has its own table. Queue order is the insertion order
/// (`enqueued_at`, then rowid), and retry-state updates keep the original
/// row so that order survives process restarts.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a store at the given path, creating the file and parent
    /// directories if needed. Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure(&conn);
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<OfflineRecord> {
        Ok(OfflineRecord {
            collection: row.get(0)?,
            id: row.get(1)?,
            payload: row.get::<_, Value>(2)?,
            last_modified: row.get(3)?,
            version: row.get(4)?,
            needs_sync: row.get::<_, i32>(5)? != 0,
        })
    }

    fn parse_queue_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncQueueItem> {
        let action: String = row.get(1)?;
        let action = action
            .parse::<SyncAction>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        Ok(SyncQueueItem {
            id: row.get(0)?,
            action,
            collection: row.get(2)?,
            payload: row.get::<_, Value>(3)?,
            enqueued_at: row.get(4)?,
            retry_count: row.get(5)?,
            last_error: row.get(6)?,
        })
    }
}

/// Configure `SQLite` for a client-resident replica
fn configure(conn: &Connection) {
    // WAL and cache tuning are best-effort (not available in-memory)
    conn.pragma_update(None, "journal_mode", "WAL").ok();
    conn.pragma_update(None, "synchronous", "NORMAL").ok();
    conn.pragma_update(None, "cache_size", 10_000).ok();
}

impl DurableStore for SqliteStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<OfflineRecord>> {
        let result = self.conn.query_row(
            "SELECT collection, id, payload, last_modified, version, needs_sync
             FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
            Self::parse_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all(&self, collection: &str) -> Result<Vec<OfflineRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, id, payload, last_modified, version, needs_sync
             FROM records
             WHERE collection = ?
             ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![collection], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn put(&self, record: &OfflineRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (collection, id, payload, last_modified, version, needs_sync)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(collection, id) DO UPDATE SET
                 payload = excluded.payload,
                 last_modified = excluded.last_modified,
                 version = excluded.version,
                 needs_sync = excluded.needs_sync",
            params![
                record.collection,
                record.id,
                record.payload,
                record.last_modified,
                record.version,
                i32::from(record.needs_sync)
            ],
        )?;

        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;

        Ok(())
    }

    fn queue_put(&self, item: &SyncQueueItem) -> Result<()> {
        // Upsert instead of replace so a retried item keeps its rowid and
        // therefore its position in the queue
        self.conn.execute(
            "INSERT INTO sync_queue (id, action, collection, payload, enqueued_at, retry_count, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 retry_count = excluded.retry_count,
                 last_error = excluded.last_error",
            params![
                item.id,
                item.action.as_str(),
                item.collection,
                item.payload,
                item.enqueued_at,
                item.retry_count,
                item.last_error
            ],
        )?;

        Ok(())
    }

    fn queue_remove(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id])?;

        Ok(())
    }

    fn queue_all(&self) -> Result<Vec<SyncQueueItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action, collection, payload, enqueued_at, retry_count, last_error
             FROM sync_queue
             ORDER BY enqueued_at ASC, rowid ASC",
        )?;

        let items = stmt
            .query_map([], Self::parse_queue_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn queue_len(&self) -> Result<usize> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;

        Ok(count)
    }
}
