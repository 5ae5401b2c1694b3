//! Statistics generation from the dedup store
//!
//! This module provides functionality for extracting and displaying
//! what the store currently knows.

use crate::crawler::CrawlSettings;
use crate::storage::DedupStore;
use crate::CrawlError;
use chrono::{DateTime, Utc};

/// Store statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatistics {
    /// Number of distinct object ids ever reported
    pub known_objects: u64,

    /// Leaves in the cached partition, if there is one
    pub cached_leaves: Option<usize>,

    pub partition_computed_at: Option<DateTime<Utc>>,

    /// Whether the cached partition matches the current settings
    pub partition_current: bool,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
/// * `settings` - Current crawl settings, used to check the cached partition
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query the store
pub fn load_statistics(
    store: &dyn DedupStore,
    settings: &CrawlSettings,
) -> Result<StoreStatistics, CrawlError> {
    let known_objects = store.count_objects()?;
    let cached = store.cached_partition()?;

    Ok(StoreStatistics {
        known_objects,
        cached_leaves: cached.as_ref().map(|p| p.leaves.len()),
        partition_computed_at: cached.as_ref().map(|p| p.computed_at),
        partition_current: cached
            .as_ref()
            .map(|p| p.fingerprint == settings.partition_fingerprint() && !p.leaves.is_empty())
            .unwrap_or(false),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Known objects: {}", stats.known_objects);

    match (stats.cached_leaves, stats.partition_computed_at) {
        (Some(leaves), Some(computed_at)) => {
            println!("Cached partition: {} leaves, computed {}", leaves, computed_at);
            if stats.partition_current {
                println!("  Matches the current area and query");
            } else {
                println!("  Stale: the next crawl will recompute it");
            }
        }
        _ => println!("Cached partition: none"),
    }
}
