//! Search API client
//!
//! This module handles all requests to the geosearch API, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Encoding the query and bbox as request parameters
//! - Classifying transport, status and decoding failures
//!
//! Nothing is retried here: a failed call is reported to the crawler, which
//! ends the run.

use crate::config::ApiConfig;
use crate::geo::BBox;
use crate::search::query::SearchQuery;
use crate::search::record::{Field, ObjectRecord};
use crate::search::response::{parse_response, SearchResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failures of the search call itself
///
/// These are not per-object anomalies; the crawler treats every variant as
/// fatal for the run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Search API returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Search API returned an undecodable body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Search API unavailable: {0}")]
    Unavailable(String),
}

/// The two calls the crawler makes against the search API
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Total number of objects matching `query` inside `bbox`
    ///
    /// A response that carries no usable count is `Ok` with an absent or
    /// malformed field; only a failed call is an error.
    async fn count(&self, bbox: &BBox, query: &SearchQuery) -> Result<Field<u64>, SearchError>;

    /// Objects matching `query` inside `bbox`, at most `query.results` of them
    async fn search(
        &self,
        bbox: &BBox,
        query: &SearchQuery,
    ) -> Result<Vec<ObjectRecord>, SearchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `SearchClient` backed by the geosearch HTTP API
pub struct HttpSearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpSearchClient {
    /// Creates a client for the endpoint in `config`
    pub fn new(config: &ApiConfig) -> Result<Self, crate::CrawlError> {
        let endpoint = Url::parse(&config.base_url)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
        let client = build_http_client(config)
            .map_err(|e| SearchError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// The full request URL for a search inside `bbox`
    pub fn request_url(&self, bbox: &BBox, query: &SearchQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .extend_pairs(query.params(bbox));
        url
    }

    /// Issues one search request and decodes the response
    pub async fn fetch(
        &self,
        bbox: &BBox,
        query: &SearchQuery,
    ) -> Result<SearchResponse, SearchError> {
        let url = self.request_url(bbox, query);
        tracing::debug!("Searching bbox {}", bbox);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SearchError::Http {
                url: self.endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Rejected {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let body = response.bytes().await.map_err(|source| SearchError::Http {
            url: self.endpoint.to_string(),
            source,
        })?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;

        let parsed = parse_response(&value);
        tracing::trace!(
            "{} returned {} features (found {:?}, display {:?})",
            bbox,
            parsed.features.len(),
            parsed.found.as_option(),
            parsed.display
        );
        Ok(parsed)
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn count(&self, bbox: &BBox, query: &SearchQuery) -> Result<Field<u64>, SearchError> {
        Ok(self.fetch(bbox, query).await?.found)
    }

    async fn search(
        &self,
        bbox: &BBox,
        query: &SearchQuery,
    ) -> Result<Vec<ObjectRecord>, SearchError> {
        Ok(self.fetch(bbox, query).await?.features)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
