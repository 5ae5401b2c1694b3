//! Decoder for geosearch responses
//!
//! Responses are GeoJSON `FeatureCollection`s:
//!
//! ```text
//! {
//!   "properties": { "ResponseMetaData": { "SearchResponse": { "found": 1200, ... } } },
//!   "features": [
//!     { "geometry": { "coordinates": [lon, lat] },
//!       "properties": { "CompanyMetaData": { "id": ..., "name": ..., ... } } }
//!   ]
//! }
//! ```
//!
//! Decoding never fails as a whole. Required values that are absent or
//! mistyped are reported through [`Field`]; optional values that are
//! mistyped are dropped.

use crate::geo::Point;
use crate::search::record::{
    Availability, Category, Day, Field, Hours, Interval, ObjectRecord, Phone,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Decoded search response
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Total number of matches for the query in the requested area,
    /// independent of page size
    pub found: Field<u64>,

    /// Suggested display mode, e.g. `SingleObject` or `multiple`
    pub display: Option<String>,

    /// Objects actually present in this page of results
    pub features: Vec<ObjectRecord>,
}

/// Decodes a raw response body
///
/// # Example
///
/// ```
/// use geo_sweep::search::parse_response;
/// use serde_json::json;
///
/// let body = json!({
///     "properties": { "ResponseMetaData": { "SearchResponse": { "found": 3 } } },
///     "features": []
/// });
/// let response = parse_response(&body);
/// assert_eq!(response.found.as_option(), Some(&3));
/// ```
pub fn parse_response(body: &Value) -> SearchResponse {
    let meta = body
        .get("properties")
        .and_then(|p| p.get("ResponseMetaData"))
        .and_then(|m| m.get("SearchResponse"));

    let found = match meta.and_then(|m| m.get("found")) {
        None | Some(Value::Null) => Field::Absent,
        Some(value) => match value.as_u64() {
            Some(n) => Field::Present(n),
            None => Field::malformed("number", type_name(value)),
        },
    };

    let display = meta
        .and_then(|m| m.get("display"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let features = match body.get("features") {
        Some(Value::Array(items)) => items.iter().map(parse_feature).collect(),
        Some(other) => {
            tracing::warn!("Ignoring non-array features value ({})", type_name(other));
            Vec::new()
        }
        None => Vec::new(),
    };

    SearchResponse {
        found,
        display,
        features,
    }
}

/// Decodes one GeoJSON feature into an object record
pub fn parse_feature(feature: &Value) -> ObjectRecord {
    let coordinates = parse_coordinates(feature.get("geometry"));

    let company = feature
        .get("properties")
        .and_then(|p| p.get("CompanyMetaData"));

    let company = match company {
        None | Some(Value::Null) => {
            return ObjectRecord {
                id: Field::Absent,
                name: Field::Absent,
                address: None,
                url: None,
                categories: Vec::new(),
                phones: Vec::new(),
                hours: None,
                coordinates,
            };
        }
        Some(Value::Object(map)) => map,
        Some(other) => {
            let found = type_name(other);
            return ObjectRecord {
                id: Field::malformed("object", found),
                name: Field::malformed("object", found),
                address: None,
                url: None,
                categories: Vec::new(),
                phones: Vec::new(),
                hours: None,
                coordinates,
            };
        }
    };

    ObjectRecord {
        id: required_string(company, "id"),
        name: required_string(company, "name"),
        address: optional_string(company, "address"),
        url: optional_string(company, "url"),
        categories: parse_list(company.get("Categories"), parse_category),
        phones: parse_list(company.get("Phones"), parse_phone),
        hours: company.get("Hours").and_then(Value::as_object).map(parse_hours),
        coordinates,
    }
}

fn parse_coordinates(geometry: Option<&Value>) -> Field<Point> {
    let coords = match geometry.and_then(|g| g.get("coordinates")) {
        None | Some(Value::Null) => return Field::Absent,
        Some(value) => value,
    };

    match coords.as_array().map(Vec::as_slice) {
        Some([lon, lat]) => match (lon.as_f64(), lat.as_f64()) {
            (Some(lon), Some(lat)) => Field::Present(Point::new(lon, lat)),
            _ => Field::malformed("coordinates", "non-numeric pair"),
        },
        _ => Field::malformed("coordinates", type_name(coords)),
    }
}

fn required_string(map: &Map<String, Value>, key: &str) -> Field<String> {
    match map.get(key) {
        None | Some(Value::Null) => Field::Absent,
        Some(Value::String(s)) if s.is_empty() => Field::Absent,
        Some(Value::String(s)) => Field::Present(s.clone()),
        Some(other) => Field::malformed("string", type_name(other)),
    }
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_list<T>(value: Option<&Value>, parse: fn(&Map<String, Value>) -> Option<T>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(parse)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_category(map: &Map<String, Value>) -> Option<Category> {
    Some(Category {
        class: optional_string(map, "class"),
        name: optional_string(map, "name")?,
    })
}

fn parse_phone(map: &Map<String, Value>) -> Option<Phone> {
    Some(Phone {
        kind: optional_string(map, "type"),
        formatted: optional_string(map, "formatted")?,
    })
}

fn parse_hours(map: &Map<String, Value>) -> Hours {
    Hours {
        text: optional_string(map, "text"),
        availabilities: parse_list(map.get("Availabilities"), |a| Some(parse_availability(a))),
    }
}

fn parse_availability(map: &Map<String, Value>) -> Availability {
    let intervals = parse_list(map.get("Intervals"), |i| {
        Some(Interval {
            from: optional_string(i, "from")?,
            to: optional_string(i, "to")?,
        })
    });

    Availability {
        days: parse_days(map),
        intervals,
        twenty_four_hours: map.get("TwentyFourHours").and_then(Value::as_bool),
    }
}

/// Expands `Everyday`, `Weekdays`, `Weekend` and per-day flags into a day set
fn parse_days(map: &Map<String, Value>) -> BTreeSet<Day> {
    let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);

    if flag("Everyday") {
        return Day::ALL.into_iter().collect();
    }

    let mut days = BTreeSet::new();
    if flag("Weekdays") {
        days.extend(Day::WEEKDAYS);
    }
    if flag("Weekend") {
        days.extend(Day::WEEKEND);
    }
    for day in Day::ALL {
        if flag(day.api_name()) {
            days.insert(day);
        }
    }
    days
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
