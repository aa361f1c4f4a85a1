//! WGS84 coordinates and bounding boxes.
//!
//! Coordinates are always stored in `(longitude, latitude)` order, matching
//! GeoJSON and the map engine's camera API. Distances are metres.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for haversine distances.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Validation errors raised by [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateValidationError {
    /// Either component was NaN or infinite.
    #[error("coordinates must be finite")]
    NonFinite,
    /// Longitude outside `[-180, 180]`.
    #[error("longitude must be within [-180, 180] (got {value})")]
    LongitudeOutOfRange {
        /// Rejected longitude.
        value: f64,
    },
    /// Latitude outside `[-90, 90]`.
    #[error("latitude must be within [-90, 90] (got {value})")]
    LatitudeOutOfRange {
        /// Rejected latitude.
        value: f64,
    },
}

/// Immutable `(longitude, latitude)` pair.
///
/// Serialises as a two-element `[lng, lat]` array.
///
/// # Examples
///
/// ```
/// use walkmap::domain::Coordinate;
///
/// let mission = Coordinate::new(-122.4165, 37.7554)?;
/// assert_eq!(mission.to_string(), "-122.4165,37.7554");
/// # Ok::<(), walkmap::domain::CoordinateValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
}

impl Coordinate {
    /// Build a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateValidationError`] when either component is not
    /// finite or lies outside the WGS84 range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoordinateValidationError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(CoordinateValidationError::NonFinite);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateValidationError::LongitudeOutOfRange { value: longitude });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateValidationError::LatitudeOutOfRange { value: latitude });
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Degrees east of the prime meridian.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Degrees north of the equator.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Return the coordinate as a GeoJSON position.
    #[must_use]
    pub const fn to_position(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Great-circle distance to `other` in metres.
    #[expect(
        clippy::float_arithmetic,
        reason = "haversine formula is inherently floating point"
    )]
    #[must_use]
    pub fn distance_m(&self, other: Self) -> f64 {
        let lat_a = self.latitude.to_radians();
        let lat_b = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = CoordinateValidationError;

    fn try_from([longitude, latitude]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(longitude, latitude)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        value.to_position()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// Axis-aligned bounding box used for camera fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    south_west: Coordinate,
    north_east: Coordinate,
}

impl Bounds {
    /// Degenerate bounds around one point.
    #[must_use]
    pub const fn around(point: Coordinate) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest bounds covering every point, or `None` for an empty input.
    #[must_use]
    pub fn covering(points: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        let mut remaining = points.into_iter();
        let first = remaining.next()?;
        Some(remaining.fold(Self::around(first), |mut bounds, point| {
            bounds.extend(point);
            bounds
        }))
    }

    /// Grow the box to include `point`.
    pub fn extend(&mut self, point: Coordinate) {
        // Components stay inside the validated WGS84 ranges, so the struct
        // literal cannot produce an invalid coordinate.
        self.south_west = Coordinate {
            longitude: self.south_west.longitude.min(point.longitude),
            latitude: self.south_west.latitude.min(point.latitude),
        };
        self.north_east = Coordinate {
            longitude: self.north_east.longitude.max(point.longitude),
            latitude: self.north_east.latitude.max(point.latitude),
        };
    }

    /// Minimum longitude and latitude corner.
    #[must_use]
    pub const fn south_west(&self) -> Coordinate {
        self.south_west
    }

    /// Maximum longitude and latitude corner.
    #[must_use]
    pub const fn north_east(&self) -> Coordinate {
        self.north_east
    }

    /// Return `[min_lng, min_lat, max_lng, max_lat]`.
    #[must_use]
    pub const fn to_array(&self) -> [f64; 4] {
        [
            self.south_west.longitude,
            self.south_west.latitude,
            self.north_east.longitude,
            self.north_east.latitude,
        ]
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for coordinate validation and geometry helpers.

    use super::*;
    use rstest::rstest;

    fn coord(longitude: f64, latitude: f64) -> Coordinate {
        Coordinate::new(longitude, latitude).expect("valid coordinate")
    }

    #[rstest]
    #[case::nan(f64::NAN, 0.0)]
    #[case::infinite(0.0, f64::INFINITY)]
    #[case::longitude(181.0, 0.0)]
    #[case::latitude(0.0, -90.5)]
    fn rejects_invalid_components(#[case] longitude: f64, #[case] latitude: f64) {
        assert!(Coordinate::new(longitude, latitude).is_err());
    }

    #[test]
    fn haversine_matches_known_city_distance() {
        let sf = coord(-122.4194, 37.7749);
        let oakland = coord(-122.2712, 37.8044);

        let distance = sf.distance_m(oakland);
        assert!(
            (13_000.0..14_000.0).contains(&distance),
            "SF to Oakland should be roughly 13.4 km, got {distance}"
        );
        assert!(sf.distance_m(sf).abs() < f64::EPSILON);
    }

    #[test]
    fn serialises_as_position_array() {
        let json = serde_json::to_string(&coord(-122.4165, 37.7554)).expect("serialise");
        assert_eq!(json, "[-122.4165,37.7554]");

        let back: Coordinate = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, coord(-122.4165, 37.7554));
        assert!(serde_json::from_str::<Coordinate>("[200.0,0.0]").is_err());
    }

    #[test]
    fn bounds_cover_every_point() {
        let bounds = Bounds::covering([
            coord(-122.42, 37.75),
            coord(-122.40, 37.77),
            coord(-122.43, 37.76),
        ])
        .expect("non-empty input");

        assert_eq!(bounds.to_array(), [-122.43, 37.75, -122.40, 37.77]);
        assert!(Bounds::covering(std::iter::empty()).is_none());
    }
}
