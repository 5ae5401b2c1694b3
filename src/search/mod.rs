//! Search API integration
//!
//! This module contains everything the crawler needs from the external
//! search service:
//! - Query parameters and their wire encoding
//! - The object record model and its tagged required fields
//! - Response decoding
//! - The `SearchClient` trait and its HTTP implementation

mod client;
mod query;
mod record;
mod response;

pub use client::{build_http_client, HttpSearchClient, SearchClient, SearchError};
pub use query::SearchQuery;
pub use record::{
    Availability, Category, Day, Field, FieldError, Hours, Interval, ObjectRecord, Phone,
};
pub use response::{parse_feature, parse_response, SearchResponse};
