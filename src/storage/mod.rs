//! Storage module for persisting crawl state
//!
//! This module handles everything that must survive between runs:
//! - The set of object ids already reported (the dedup set)
//! - The serialized record stored with each id
//! - The cached partition of the search area

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CachedPartition, DedupStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the SQLite store at `path`, creating it if needed
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}
