use crate::config::types::{ApiConfig, AreaConfig, Config, CrawlerConfig, StorageConfig};
use crate::geo::BBox;
use crate::search::SearchQuery;
use crate::ConfigError;
use url::Url;

/// Largest page size the search API accepts
const MAX_RESULTS: u32 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_query(&config.query)?;
    validate_area(&config.area)?;
    validate_crawler_config(&config.crawler, config.threshold(), config.query.results)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation("api-key cannot be empty".to_string()));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_query(query: &SearchQuery) -> Result<(), ConfigError> {
    if query.text.trim().is_empty() {
        return Err(ConfigError::Validation("query text cannot be empty".to_string()));
    }

    if query.lang.trim().is_empty() {
        return Err(ConfigError::Validation("query lang cannot be empty".to_string()));
    }

    if query.results < 1 || query.results > MAX_RESULTS {
        return Err(ConfigError::Validation(format!(
            "results must be between 1 and {}, got {}",
            MAX_RESULTS, query.results
        )));
    }

    Ok(())
}

fn validate_area(area: &AreaConfig) -> Result<(), ConfigError> {
    BBox::new(area.min, area.max)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("Invalid area: {}", e)))
}

fn validate_crawler_config(
    config: &CrawlerConfig,
    threshold: u64,
    results: u32,
) -> Result<(), ConfigError> {
    // A leaf above the page size could not be fetched in a single request
    if threshold < 1 || threshold > u64::from(results) {
        return Err(ConfigError::Validation(format!(
            "threshold must be between 1 and results ({}), got {}",
            results, threshold
        )));
    }

    if config.max_workers < 1 || config.max_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 256, got {}",
            config.max_workers
        )));
    }

    if config.max_depth < 1 {
        return Err(ConfigError::Validation(
            "max-depth must be >= 1".to_string(),
        ));
    }

    if !(config.min_span > 0.0 && config.min_span.is_finite()) {
        return Err(ConfigError::Validation(format!(
            "min-span must be a positive number of degrees, got {}",
            config.min_span
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
