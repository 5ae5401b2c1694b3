//! In-memory storage implementation
//!
//! Nothing survives the process. Useful for tests and one-off runs that
//! should report everything they find.

use crate::storage::traits::{CachedPartition, DedupStore, StorageResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    partition: Option<CachedPartition>,
}

/// `DedupStore` held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DedupStore for MemoryStore {
    fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.inner().objects.contains_key(id))
    }

    fn put(&self, id: &str, blob: &[u8]) -> StorageResult<bool> {
        let mut inner = self.inner();
        if inner.objects.contains_key(id) {
            return Ok(false);
        }
        inner.objects.insert(id.to_string(), blob.to_vec());
        Ok(true)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner().objects.get(id).cloned())
    }

    fn cached_partition(&self) -> StorageResult<Option<CachedPartition>> {
        Ok(self.inner().partition.clone())
    }

    fn put_cached_partition(&self, partition: &CachedPartition) -> StorageResult<()> {
        self.inner().partition = Some(partition.clone());
        Ok(())
    }

    fn count_objects(&self) -> StorageResult<u64> {
        Ok(self.inner().objects.len() as u64)
    }

    fn clear(&self) -> StorageResult<()> {
        let mut inner = self.inner();
        inner.objects.clear();
        inner.partition = None;
        Ok(())
    }
}
