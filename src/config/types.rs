use crate::crawler::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_SPAN};
use crate::geo::{BBox, Point};
use crate::search::SearchQuery;
use crate::GeoError;
use serde::Deserialize;

/// Main configuration structure for geo-sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub query: SearchQuery,
    pub area: AreaConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// Search API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL, e.g. `https://search-maps.yandex.ru/v1/`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// API key sent with every request
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Root search area, as south-west and north-east corners
#[derive(Debug, Clone, Deserialize)]
pub struct AreaConfig {
    pub min: Point,
    pub max: Point,
}

/// Partitioning and worker pool settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Largest found-count a leaf box may report; defaults to the page size
    pub threshold: Option<u64>,

    /// Worker cap shared by the partitioner and both crawl stages
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Boxes this many bisections below the root are never split again
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Smallest box side, in degrees, that bisection may produce
    #[serde(rename = "min-span", default = "default_min_span")]
    pub min_span: f64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Config {
    /// The split threshold, falling back to the query page size
    pub fn threshold(&self) -> u64 {
        self.crawler
            .threshold
            .unwrap_or(u64::from(self.query.results))
    }

    /// The root search area as a bounding box
    pub fn root_bbox(&self) -> Result<BBox, GeoError> {
        BBox::new(self.area.min, self.area.max)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("geo-sweep/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_min_span() -> f64 {
    DEFAULT_MIN_SPAN
}
