//! Geometry primitives for the search area
//!
//! The crawler works on axis-aligned rectangles in longitude/latitude space.
//! Everything here is a plain value type; partitioning logic lives in
//! `crawler`.

mod bbox;

pub use bbox::{Axis, BBox, Point};
