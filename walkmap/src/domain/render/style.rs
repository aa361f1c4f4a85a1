//! Route styling and layer definitions.

use serde_json::json;

use crate::domain::ports::{
    HERE, LayerKind, LayerSpec, MapOptions, PULSING_DOT, PopupContent, ROUTES, ZoomRange,
};
use crate::domain::{Coordinate, Destination, Feature, FeatureCollection, Geometry, SelectionSet};

/// Colours, widths and camera margins used when drawing a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Line colour of the selected route.
    pub accent_color: String,
    /// Line colour of every other route.
    pub common_color: String,
    /// Line width of the selected route, in pixels.
    pub accent_width: f64,
    /// Line width of every other route, in pixels.
    pub common_width: f64,
    /// Margin kept around the candidates when fitting the camera.
    pub fit_padding_px: u32,
    /// Style URL of the nested popup map.
    pub detail_style: String,
    /// Fixed zoom of the nested popup map.
    pub detail_zoom: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            accent_color: "#e4572e".to_owned(),
            common_color: "#8d99ae".to_owned(),
            accent_width: 6.0,
            common_width: 3.0,
            fit_padding_px: 80,
            detail_style: "mapbox://styles/mapbox/standard".to_owned(),
            detail_zoom: 18.0,
        }
    }
}

impl RenderStyle {
    /// `(color, width)` for a route in the given selection state.
    #[must_use]
    pub fn route_paint(&self, selected: bool) -> (&str, f64) {
        if selected {
            (self.accent_color.as_str(), self.accent_width)
        } else {
            (self.common_color.as_str(), self.common_width)
        }
    }

    /// Options for the nested map shown inside a destination popup.
    #[must_use]
    pub fn detail_map(&self, center: Coordinate) -> MapOptions {
        MapOptions {
            style: self.detail_style.clone(),
            center,
            zoom: self.detail_zoom,
            zoom_range: ZoomRange {
                min: self.detail_zoom,
                max: self.detail_zoom,
            },
            interactive: true,
        }
    }
}

/// Build the complete `routes` source payload for a selection.
#[must_use]
pub fn route_features(selection: &SelectionSet, style: &RenderStyle) -> FeatureCollection {
    selection
        .destinations()
        .iter()
        .enumerate()
        .map(|(index, destination)| {
            let selected = selection.selected_index() == Some(index);
            let (color, width) = style.route_paint(selected);
            Feature::new(Geometry::line(destination.route.geometry()))
                .with_property("index", index)
                .with_property("selected", selected)
                .with_property("color", color)
                .with_property("width", width)
        })
        .collect()
}

/// Build the `here` source payload.
#[must_use]
pub fn here_features(center: Coordinate) -> FeatureCollection {
    [Feature::new(Geometry::point(center))].into_iter().collect()
}

pub(super) fn here_layer() -> LayerSpec {
    LayerSpec {
        id: HERE,
        kind: LayerKind::Symbol,
        source: HERE,
        layout: json!({
            "icon-image": PULSING_DOT.as_str(),
            "icon-allow-overlap": true,
        }),
        paint: json!({}),
    }
}

pub(super) fn routes_layer() -> LayerSpec {
    LayerSpec {
        id: ROUTES,
        kind: LayerKind::Line,
        source: ROUTES,
        layout: json!({
            "line-join": "round",
            "line-cap": "round",
            "line-sort-key": ["case", ["get", "selected"], 1, 0],
        }),
        paint: json!({
            "line-color": ["get", "color"],
            "line-width": ["get", "width"],
        }),
    }
}

pub(super) fn popup_content(index: usize, destination: &Destination) -> PopupContent {
    PopupContent {
        title: format!("Point {}", index.saturating_add(1)),
        image: destination.image.clone(),
        route_length_m: destination.route.length_m(),
    }
}
