//! Search query parameters
//!
//! The fixed part of every request. The bbox is added per call.

use crate::geo::BBox;
use serde::{Deserialize, Serialize};

/// Caller-supplied search parameters
///
/// The bbox is supplied per request; everything else is fixed for a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query, e.g. `coffee`
    pub text: String,

    /// Response language, e.g. `ru_RU`
    pub lang: String,

    /// Object type filter, e.g. `biz` for businesses
    #[serde(rename = "type")]
    pub kind: String,

    /// Restrict results to the requested area instead of treating it as a hint
    #[serde(rename = "restrict-to-area")]
    pub restrict_to_area: bool,

    /// Page size: the maximum number of objects one request returns
    pub results: u32,
}

impl SearchQuery {
    /// Request parameters for a search restricted to `bbox`
    pub fn params(&self, bbox: &BBox) -> Vec<(&'static str, String)> {
        vec![
            ("text", self.text.clone()),
            ("lang", self.lang.clone()),
            ("type", self.kind.clone()),
            ("rspn", if self.restrict_to_area { "1" } else { "0" }.to_string()),
            ("results", self.results.to_string()),
            ("bbox", bbox.to_string()),
        ]
    }
}
