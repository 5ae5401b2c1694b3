//! Object records returned by the search API
//!
//! Required fields are carried as [`Field`] values so that a missing or
//! mistyped value is visible to the caller instead of being defaulted.

use crate::geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised when reading a required field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Required field missing: {field}")]
    Missing { field: &'static str },

    #[error("Malformed field {field}: expected {expected}, found {found}")]
    Malformed {
        field: &'static str,
        expected: String,
        found: String,
    },
}

/// A required value as decoded from a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field<T> {
    Present(T),
    Absent,
    Malformed { expected: String, found: String },
}

impl<T> Field<T> {
    pub fn malformed(expected: &str, found: impl Into<String>) -> Self {
        Self::Malformed {
            expected: expected.to_string(),
            found: found.into(),
        }
    }

    /// Reads the value, naming `field` in the error if it is not present
    pub fn get(&self, field: &'static str) -> Result<&T, FieldError> {
        match self {
            Self::Present(value) => Ok(value),
            Self::Absent => Err(FieldError::Missing { field }),
            Self::Malformed { expected, found } => Err(FieldError::Malformed {
                field,
                expected: expected.clone(),
                found: found.clone(),
            }),
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// A business category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category class, e.g. `cafe`
    pub class: Option<String>,
    pub name: String,
}

/// A contact number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phone {
    /// Contact type, e.g. `phone` or `fax`
    pub kind: Option<String>,

    /// Full number with country and area code
    pub formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub const WEEKDAYS: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub const WEEKEND: [Day; 2] = [Day::Saturday, Day::Sunday];

    /// The flag name used for this day in API responses
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

/// Opening interval, times as `HH:MM:SS` strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub from: String,
    pub to: String,
}

/// One opening-hours rule: a set of days and the intervals they share
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub days: BTreeSet<Day>,
    pub intervals: Vec<Interval>,
    pub twenty_four_hours: Option<bool>,
}

/// Opening hours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hours {
    /// Free-form description, e.g. `daily, 10:00–22:00`
    pub text: Option<String>,
    pub availabilities: Vec<Availability>,
}

/// A single point of interest found by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: Field<String>,
    pub name: Field<String>,
    pub address: Option<String>,
    pub url: Option<String>,
    pub categories: Vec<Category>,
    pub phones: Vec<Phone>,
    pub hours: Option<Hours>,
    pub coordinates: Field<Point>,
}

impl ObjectRecord {
    /// Creates a record with its required fields present
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: Point) -> Self {
        Self {
            id: Field::Present(id.into()),
            name: Field::Present(name.into()),
            address: None,
            url: None,
            categories: Vec::new(),
            phones: Vec::new(),
            hours: None,
            coordinates: Field::Present(coordinates),
        }
    }

    /// The object id, the deduplication key
    pub fn id(&self) -> Result<&str, FieldError> {
        self.id.get("id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str, FieldError> {
        self.name.get("name").map(String::as_str)
    }

    pub fn coordinates(&self) -> Result<Point, FieldError> {
        self.coordinates.get("coordinates").copied()
    }

    /// Replaces the id with a locally generated one
    pub fn assign_fallback_id(&mut self, id: impl Into<String>) {
        self.id = Field::Present(id.into());
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
