//! Crawler module for partitioning and sweeping the search area
//!
//! This module contains the core crawling logic, including:
//! - Recursive bisection of the area with a growing worker pool
//! - The search and dedup stages run over the resulting partition
//! - Overall crawl coordination

mod partitioner;
mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use partitioner::{
    PartitionSettings, PartitionStats, Partitioner, DEFAULT_MAX_DEPTH, DEFAULT_MIN_SPAN,
};
pub use pipeline::{CrawlPipeline, CrawlReport, CrawlSettings};

use crate::config::Config;
use crate::search::{HttpSearchClient, ObjectRecord};
use crate::storage::{open_storage, DedupStore};
use crate::CrawlError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the store named in the configuration
/// 2. Clear it first, if `fresh` is set
/// 3. Build the HTTP search client
/// 4. Partition the area (or reuse the cached partition)
/// 5. Search every leaf and keep the objects not seen before
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to forget every known object and the cached partition
///
/// # Returns
///
/// * `Ok((objects, report))` - Objects new in this run, and a run summary
/// * `Err(CrawlError)` - Crawl failed
pub async fn crawl(
    config: &Config,
    fresh: bool,
) -> Result<(Vec<ObjectRecord>, CrawlReport), CrawlError> {
    let settings = CrawlSettings::from_config(config)?;

    let store = open_storage(Path::new(&config.storage.database_path))?;
    if fresh {
        tracing::info!("Clearing known objects and cached partition");
        store.clear()?;
    }

    let client = HttpSearchClient::new(&config.api)?;
    let pipeline = CrawlPipeline::new(Arc::new(client), Arc::new(store), settings);
    pipeline.run_with_report().await
}

/// Locks a mutex, recovering the data if a previous holder panicked
///
/// Every critical section in the crawler leaves the state consistent before
/// any call that could panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
