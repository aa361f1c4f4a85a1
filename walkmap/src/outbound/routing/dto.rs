//! DTOs for decoding directions responses.

use serde::Deserialize;

use crate::domain::{Coordinate, RouteRecord};

#[derive(Debug, Deserialize)]
pub(super) struct DirectionsDto {
    #[serde(default)]
    pub(super) routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RouteDto {
    /// Route length in metres.
    pub(super) distance: f64,
    pub(super) geometry: LineStringDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct LineStringDto {
    #[serde(default)]
    pub(super) coordinates: Vec<[f64; 2]>,
}

impl RouteDto {
    pub(super) fn into_record(self, end: Coordinate) -> Result<RouteRecord, String> {
        let geometry = self
            .geometry
            .coordinates
            .into_iter()
            .map(Coordinate::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| format!("route geometry is invalid: {error}"))?;
        RouteRecord::new(end, geometry, self.distance).map_err(|error| error.to_string())
    }
}
