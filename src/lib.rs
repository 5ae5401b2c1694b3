//! geo-sweep: incremental point-of-interest discovery
//!
//! This crate sweeps a geographic rectangle with a count-capped search API,
//! splitting the area until every piece fits in one page of results, and
//! reports only the objects it has not seen on earlier runs.

pub mod config;
pub mod crawler;
pub mod geo;
pub mod output;
pub mod search;
pub mod storage;

use thiserror::Error;

/// Main error type for geo-sweep operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search request failed: {0}")]
    Search(#[from] search::SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid search area: {0}")]
    Geo(#[from] GeoError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Bounding box construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Degenerate bounding box: min {min:?} must be strictly below max {max:?}")]
    Degenerate { min: [f64; 2], max: [f64; 2] },

    #[error("Bounding box coordinates must be finite")]
    NonFinite,
}

/// Result type alias for geo-sweep operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlPipeline, CrawlReport, CrawlSettings, PartitionSettings, Partitioner};
pub use geo::{BBox, Point};
pub use search::{ObjectRecord, SearchClient, SearchQuery};
pub use storage::DedupStore;
