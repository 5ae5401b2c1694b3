//! Configuration module for geo-sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use geo_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("geo-sweep.toml")).unwrap();
//! println!("Leaves will hold at most {} objects", config.threshold());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{ApiConfig, AreaConfig, Config, CrawlerConfig, StorageConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
