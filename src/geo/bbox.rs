//! Axis-aligned rectangles in longitude/latitude space
//!
//! A `BBox` is an immutable value: bisection produces two new boxes that
//! share the split line and together cover exactly the original.

use crate::GeoError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in longitude/latitude order
///
/// Serialized as `[lon, lat]`, the GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Lon => self.lon,
            Axis::Lat => self.lat,
        }
    }
}

impl From<[f64; 2]> for Point {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.lon, point.lat]
    }
}

/// One of the two axes a box can be split along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Lon,
    Lat,
}

/// Axis-aligned bounding box defined by its south-west and north-east corners
///
/// Invariant: `min.lon < max.lon` and `min.lat < max.lat`, all finite.
/// Serialized as `[[lon0, lat0], [lon1, lat1]]`; deserialization re-checks
/// the invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[Point; 2]", into = "[Point; 2]")]
pub struct BBox {
    min: Point,
    max: Point,
}

impl BBox {
    /// Creates a new bounding box, rejecting degenerate or inverted corners
    ///
    /// # Example
    ///
    /// ```
    /// use geo_sweep::geo::{BBox, Point};
    ///
    /// let bbox = BBox::new(Point::new(37.0, 55.4), Point::new(38.2, 56.0)).unwrap();
    /// assert_eq!(bbox.to_string(), "37,55.4~38.2,56");
    /// ```
    pub fn new(min: Point, max: Point) -> Result<Self, GeoError> {
        let coords = [min.lon, min.lat, max.lon, max.lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(GeoError::NonFinite);
        }

        if min.lon >= max.lon || min.lat >= max.lat {
            return Err(GeoError::Degenerate {
                min: [min.lon, min.lat],
                max: [max.lon, max.lat],
            });
        }

        Ok(Self { min, max })
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    /// Extent of the box along an axis
    pub fn span(&self, axis: Axis) -> f64 {
        self.max.coord(axis) - self.min.coord(axis)
    }

    /// The axis with the larger extent; ties go to latitude
    pub fn longer_axis(&self) -> Axis {
        if self.span(Axis::Lon) > self.span(Axis::Lat) {
            Axis::Lon
        } else {
            Axis::Lat
        }
    }

    pub fn area(&self) -> f64 {
        self.span(Axis::Lon) * self.span(Axis::Lat)
    }

    /// Half-open containment: the min edges belong to the box, the max edges
    /// belong to its neighbour.
    pub fn contains(&self, point: &Point) -> bool {
        point.lon >= self.min.lon
            && point.lon < self.max.lon
            && point.lat >= self.min.lat
            && point.lat < self.max.lat
    }

    /// Splits the box at the midpoint of `axis`
    ///
    /// Returns the lower half first. Both halves share the split line, so
    /// together they reconstruct the original box exactly.
    pub fn split(&self, axis: Axis) -> (BBox, BBox) {
        match axis {
            Axis::Lon => {
                let mid = (self.min.lon + self.max.lon) / 2.0;
                (
                    BBox {
                        min: self.min,
                        max: Point::new(mid, self.max.lat),
                    },
                    BBox {
                        min: Point::new(mid, self.min.lat),
                        max: self.max,
                    },
                )
            }
            Axis::Lat => {
                let mid = (self.min.lat + self.max.lat) / 2.0;
                (
                    BBox {
                        min: self.min,
                        max: Point::new(self.max.lon, mid),
                    },
                    BBox {
                        min: Point::new(self.min.lon, mid),
                        max: self.max,
                    },
                )
            }
        }
    }

    /// Splits the box across its longer side
    pub fn bisect(&self) -> (BBox, BBox) {
        self.split(self.longer_axis())
    }

    /// Whether bisecting would still leave halves at least `min_span` wide
    /// along the split axis.
    ///
    /// Also false when the midpoint is not representable strictly between
    /// the corners, which happens long before `f64` runs out of digits for
    /// any sane `min_span`.
    pub fn is_splittable(&self, min_span: f64) -> bool {
        let axis = self.longer_axis();
        let lo = self.min.coord(axis);
        let hi = self.max.coord(axis);
        let mid = (lo + hi) / 2.0;
        self.span(axis) >= 2.0 * min_span && lo < mid && mid < hi
    }
}

impl TryFrom<[Point; 2]> for BBox {
    type Error = GeoError;

    fn try_from([min, max]: [Point; 2]) -> Result<Self, Self::Error> {
        BBox::new(min, max)
    }
}

impl From<BBox> for [Point; 2] {
    fn from(bbox: BBox) -> Self {
        [bbox.min, bbox.max]
    }
}

/// Renders the search API's `bbox` parameter: `lon0,lat0~lon1,lat1`
impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}~{},{}",
            self.min.lon, self.min.lat, self.max.lon, self.max.lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min: [f64; 2], max: [f64; 2]) -> BBox {
        BBox::new(min.into(), max.into()).unwrap()
    }

    #[test]
    fn test_new_rejects_degenerate_box() {
        let result = BBox::new(Point::new(1.0, 0.0), Point::new(1.0, 2.0));
        assert!(matches!(result, Err(GeoError::Degenerate { .. })));
    }

    #[test]
    fn test_new_rejects_inverted_box() {
        let result = BBox::new(Point::new(0.0, 2.0), Point::new(1.0, 0.0));
        assert!(matches!(result, Err(GeoError::Degenerate { .. })));
    }

    #[test]
    fn test_new_rejects_non_finite() {
        let result = BBox::new(Point::new(f64::NAN, 0.0), Point::new(1.0, 1.0));
        assert!(matches!(result, Err(GeoError::NonFinite)));
    }

    #[test]
    fn test_bisect_splits_longer_latitude_side() {
        let (lower, upper) = bbox([0.0, 0.0], [1.0, 2.0]).bisect();
        assert_eq!(lower, bbox([0.0, 0.0], [1.0, 1.0]));
        assert_eq!(upper, bbox([0.0, 1.0], [1.0, 2.0]));
    }

    #[test]
    fn test_bisect_splits_longer_longitude_side() {
        let (west, east) = bbox([0.0, 0.0], [4.0, 1.0]).bisect();
        assert_eq!(west, bbox([0.0, 0.0], [2.0, 1.0]));
        assert_eq!(east, bbox([2.0, 0.0], [4.0, 1.0]));
    }

    #[test]
    fn test_split_by_longitude() {
        let (west, east) = bbox([2.0, 5.0], [5.0, 10.0]).split(Axis::Lon);
        assert_eq!(west, bbox([2.0, 5.0], [3.5, 10.0]));
        assert_eq!(east, bbox([3.5, 5.0], [5.0, 10.0]));
    }

    #[test]
    fn test_square_box_splits_latitude() {
        assert_eq!(bbox([0.0, 0.0], [1.0, 1.0]).longer_axis(), Axis::Lat);
    }

    #[test]
    fn test_halves_reconstruct_original() {
        let original = bbox([37.048427, 55.43644866], [38.175903, 56.04690174]);
        let (a, b) = original.bisect();

        assert_eq!(a.min(), original.min());
        assert_eq!(b.max(), original.max());
        assert!((a.area() + b.area() - original.area()).abs() < 1e-12);
    }

    #[test]
    fn test_contains_is_half_open() {
        let b = bbox([0.0, 0.0], [1.0, 1.0]);
        assert!(b.contains(&Point::new(0.0, 0.0)));
        assert!(b.contains(&Point::new(0.5, 0.999)));
        assert!(!b.contains(&Point::new(1.0, 0.5)));
        assert!(!b.contains(&Point::new(0.5, 1.0)));
    }

    #[test]
    fn test_is_splittable() {
        let b = bbox([0.0, 0.0], [1.0, 0.5]);
        assert!(b.is_splittable(0.5));
        assert!(!b.is_splittable(0.6));
    }

    #[test]
    fn test_display_matches_api_format() {
        let b = bbox([37.048427, 55.43644866], [38.175903, 56.04690174]);
        assert_eq!(b.to_string(), "37.048427,55.43644866~38.175903,56.04690174");
    }

    #[test]
    fn test_serialized_as_nested_arrays() {
        let b = bbox([0.5, 1.0], [2.0, 3.0]);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[[0.5,1.0],[2.0,3.0]]");
    }

    #[test]
    fn test_deserialize_validates() {
        let result: Result<BBox, _> = serde_json::from_str("[[1.0,1.0],[0.0,2.0]]");
        assert!(result.is_err());
    }
}
