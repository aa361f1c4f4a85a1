//! Minimal GeoJSON feature collections pushed into map sources.

use serde::Serialize;
use serde_json::{Map, Value};

use super::Coordinate;

/// Geometry variants used by the map layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Single `[lng, lat]` position.
    Point([f64; 2]),
    /// Polyline of positions.
    LineString(Vec<[f64; 2]>),
}

impl Geometry {
    /// Point geometry at `at`.
    #[must_use]
    pub const fn point(at: Coordinate) -> Self {
        Self::Point(at.to_position())
    }

    /// Line string through `points` in order.
    #[must_use]
    pub fn line(points: &[Coordinate]) -> Self {
        Self::LineString(points.iter().map(|point| point.to_position()).collect())
    }
}

/// One GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Feature shape.
    pub geometry: Geometry,
    /// Properties read by layer paint expressions.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Feature without properties.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    /// Add or replace one property.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    /// Look up one property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A whole source payload; sources are always replaced with one of these.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Features in draw order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Collection with no features.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            features: Vec::new(),
        }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_as_geojson() {
        let a = Coordinate::new(-122.41, 37.75).expect("valid coordinate");
        let b = Coordinate::new(-122.42, 37.76).expect("valid coordinate");
        let collection: FeatureCollection = [Feature::new(Geometry::line(&[a, b]))
            .with_property("color", "#ff5a36")
            .with_property("width", 6.0)]
        .into_iter()
        .collect();

        let value = serde_json::to_value(&collection).expect("serialise");
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-122.41, 37.75], [-122.42, 37.76]]
                    },
                    "properties": { "color": "#ff5a36", "width": 6.0 }
                }]
            })
        );
    }
}
