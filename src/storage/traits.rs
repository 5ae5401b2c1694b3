//! Storage traits and error types
//!
//! This module defines the trait interface for dedup store backends and
//! associated error types.

use crate::geo::BBox;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A computed partition together with the inputs it was computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPartition {
    /// Digest of the root area, query and partitioner settings
    pub fingerprint: String,

    pub leaves: Vec<BBox>,

    pub computed_at: DateTime<Utc>,
}

impl CachedPartition {
    pub fn new(fingerprint: impl Into<String>, leaves: Vec<BBox>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            leaves,
            computed_at: Utc::now(),
        }
    }
}

/// Persistent store of seen object ids and the cached partition
///
/// Implementations are shared by every dedup worker, so all methods take
/// `&self`. `put` is write-once: storing an id that already exists leaves
/// the first payload in place and reports `false`, so exactly one of several
/// concurrent puts for the same id wins.
pub trait DedupStore: Send + Sync {
    /// Whether an object with this id has been seen before
    fn exists(&self, id: &str) -> StorageResult<bool>;

    /// Records an object id with its serialized payload
    ///
    /// Returns `true` if the id was new.
    fn put(&self, id: &str, blob: &[u8]) -> StorageResult<bool>;

    /// The stored payload for an id
    fn get(&self, id: &str) -> StorageResult<Option<Vec<u8>>>;

    /// The last partition written, if any
    ///
    /// An entry that no longer decodes reads as `None`, so the next crawl
    /// recomputes and overwrites it.
    fn cached_partition(&self) -> StorageResult<Option<CachedPartition>>;

    /// Replaces the cached partition
    fn put_cached_partition(&self, partition: &CachedPartition) -> StorageResult<()>;

    /// Number of known object ids
    fn count_objects(&self) -> StorageResult<u64>;

    /// Forgets every object and the cached partition
    fn clear(&self) -> StorageResult<()>;
}
