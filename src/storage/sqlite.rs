//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DedupStore trait.

use crate::storage::schema::{initialize_schema, PARTITION_KEY};
use crate::storage::traits::{CachedPartition, DedupStore, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can serve every worker.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves nothing half-applied in SQLite
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DedupStore for SqliteStore {
    fn exists(&self, id: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row("SELECT 1 FROM objects WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn put(&self, id: &str, blob: &[u8]) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO objects (id, payload, first_seen_at) VALUES (?1, ?2, ?3)",
            params![id, blob, now],
        )?;
        Ok(inserted > 0)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Vec<u8>>> {
        let payload = self
            .conn()
            .query_row(
                "SELECT payload FROM objects WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn cached_partition(&self) -> StorageResult<Option<CachedPartition>> {
        let value: Option<Vec<u8>> = self
            .conn()
            .query_row(
                "SELECT value FROM cache WHERE key = ?1",
                params![PARTITION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(bytes) = value else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(partition) => Ok(Some(partition)),
            Err(e) => {
                tracing::warn!("Ignoring undecodable cached partition: {}", e);
                Ok(None)
            }
        }
    }

    fn put_cached_partition(&self, partition: &CachedPartition) -> StorageResult<()> {
        let value = serde_json::to_vec(partition)?;
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO cache (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![PARTITION_KEY, value, now],
        )?;
        Ok(())
    }

    fn count_objects(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn clear(&self) -> StorageResult<()> {
        self.conn().execute_batch(
            "
            DELETE FROM objects;
            DELETE FROM cache;
        ",
        )?;
        Ok(())
    }
}
