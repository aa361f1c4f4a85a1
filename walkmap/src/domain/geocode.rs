//! Adapter from geocoder `result` payloads to search targets.

use serde::Deserialize;

use super::{Coordinate, CoordinateValidationError};

/// Errors raised while extracting a target from a geocoder result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeocodeError {
    /// Neither `center` nor `geometry.coordinates` was present.
    #[error("geocode result carries no coordinates")]
    MissingCoordinates,
    /// Coordinates were present but not a valid WGS84 position.
    #[error("geocode result coordinates are invalid: {0}")]
    InvalidCoordinates(#[from] CoordinateValidationError),
}

/// Point geometry attached to a geocoder feature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeGeometry {
    /// `[lng, lat]` position.
    pub coordinates: [f64; 2],
}

/// One selected geocoder feature, as emitted by the search widget.
///
/// # Examples
///
/// ```
/// use walkmap::domain::GeocodeResult;
///
/// let result: GeocodeResult = serde_json::from_str(
///     r#"{ "center": [-122.4165, 37.7554], "place_name": "Mission Dolores Park" }"#,
/// )?;
/// let target = result.target()?;
/// assert_eq!(target.longitude(), -122.4165);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GeocodeResult {
    /// Preferred `[lng, lat]` target.
    #[serde(default)]
    pub center: Option<[f64; 2]>,
    /// Fallback point geometry.
    #[serde(default)]
    pub geometry: Option<GeocodeGeometry>,
    /// Human-readable label; informational only.
    #[serde(default)]
    pub place_name: Option<String>,
}

impl GeocodeResult {
    /// Build a result pointing at an already validated coordinate.
    #[must_use]
    pub fn at(target: Coordinate) -> Self {
        Self {
            center: Some(target.to_position()),
            ..Self::default()
        }
    }

    /// Resolve the search target, preferring `center` over the geometry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] when no usable coordinate is present.
    pub fn target(&self) -> Result<Coordinate, GeocodeError> {
        let position = self
            .center
            .or_else(|| self.geometry.as_ref().map(|geometry| geometry.coordinates))
            .ok_or(GeocodeError::MissingCoordinates)?;
        Ok(Coordinate::try_from(position)?)
    }
}
