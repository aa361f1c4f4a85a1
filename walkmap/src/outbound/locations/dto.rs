//! DTOs for decoding the location backend's nearest-locations payload.

use serde::Deserialize;

use crate::domain::{CandidatePoint, Coordinate, ImageRef};

#[derive(Debug, Deserialize)]
pub(super) struct NearestLocationsDto {
    #[serde(default)]
    pub(super) nearest_locations: Vec<LocationDto>,
}

/// Location identifiers arrive either as numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum LocationIdDto {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationDto {
    pub(super) id: Option<LocationIdDto>,
    pub(super) latitude: f64,
    pub(super) longitude: f64,
    /// Distance from the queried centre in kilometres.
    pub(super) distance: Option<f64>,
}

impl LocationIdDto {
    fn into_image_ref(self) -> Option<ImageRef> {
        let id = match self {
            Self::Number(id) => id.to_string(),
            Self::Text(id) => id.trim().to_owned(),
        };
        (!id.is_empty()).then(|| ImageRef::new(id))
    }
}

impl LocationDto {
    #[expect(
        clippy::float_arithmetic,
        reason = "the backend reports distance in kilometres"
    )]
    pub(super) fn into_candidate(self, center: Coordinate) -> Result<CandidatePoint, String> {
        let coordinate = Coordinate::new(self.longitude, self.latitude).map_err(|error| {
            format!(
                "location ({}, {}) is invalid: {error}",
                self.longitude, self.latitude
            )
        })?;
        let distance_m = self
            .distance
            .filter(|distance| distance.is_finite() && *distance >= 0.0)
            .map_or_else(|| center.distance_m(coordinate), |km| km * 1_000.0);
        Ok(CandidatePoint {
            coordinate,
            image_ref: self.id.and_then(LocationIdDto::into_image_ref),
            distance_m,
        })
    }
}
