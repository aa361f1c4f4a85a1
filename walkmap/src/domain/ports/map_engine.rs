//! Driven port for the map rendering engine.
//!
//! The engine is a shared external resource. Every call is a single
//! replace-whole-value operation issued from the session's event loop; the
//! domain never patches a source incrementally.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde_json::Value;

use super::define_port_error;
use crate::domain::{Bounds, Coordinate, FeatureCollection, ImageUrl};

/// Fixed style identifier for a source, layer, or style image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleId(&'static str);

impl StyleId {
    /// Wrap a style identifier.
    #[must_use]
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// Identifier as passed to the engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

/// Source and layer showing the current search centre.
pub const HERE: StyleId = StyleId::new("here");
/// Source and layer showing every route of the cycle.
pub const ROUTES: StyleId = StyleId::new("routes");
/// Style image holding the pulsing indicator.
pub const PULSING_DOT: StyleId = StyleId::new("pulsing-dot");

/// Engine-issued marker handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    /// Wrap an engine-issued marker id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Engine-issued popup handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(u64);

impl PopupId {
    /// Wrap an engine-issued popup id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Screen-space position of a pointer event, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Pixels from the left edge.
    pub x: f64,
    /// Pixels from the top edge.
    pub y: f64,
}

/// Inclusive zoom range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    /// Lowest allowed zoom.
    pub min: f64,
    /// Highest allowed zoom.
    pub max: f64,
}

/// Rendering primitive used by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Icon drawn at each point feature.
    Symbol,
    /// Stroke along each line feature.
    Line,
}

/// Layer definition in the engine's style vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Layer id.
    pub id: StyleId,
    /// Rendering primitive.
    pub kind: LayerKind,
    /// Source the layer draws.
    pub source: StyleId,
    /// Layout properties object.
    pub layout: Value,
    /// Paint properties object, possibly data-driven.
    pub paint: Value,
}

/// One point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Destination index the marker belongs to; `None` for standalone markers.
    pub index: Option<usize>,
    /// Marker position.
    pub coordinate: Coordinate,
    /// When set, the engine must report a click as `MarkerClicked` only and
    /// never as a background map click.
    pub stop_click_propagation: bool,
}

/// Content rendered inside a destination popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    /// Heading text.
    pub title: String,
    /// Destination photo, when one was fetched.
    pub image: Option<ImageUrl>,
    /// Walking distance in metres.
    pub route_length_m: f64,
}

/// Popup anchored to a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupSpec {
    /// Destination index the popup describes.
    pub index: usize,
    /// Marker the popup is anchored to.
    pub marker: MarkerId,
    /// Rendered content.
    pub content: PopupContent,
}

/// Camera animation command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    /// Destination of the camera.
    pub center: Coordinate,
    /// Zoom on arrival.
    pub zoom: f64,
    /// Animation length.
    pub duration: Duration,
}

/// Options for creating a map instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Style URL.
    pub style: String,
    /// Initial camera centre.
    pub center: Coordinate,
    /// Initial zoom.
    pub zoom: f64,
    /// Allowed zoom range.
    pub zoom_range: ZoomRange,
    /// Whether pointer interaction starts enabled.
    pub interactive: bool,
}

define_port_error! {
    /// Errors surfaced by the map engine.
    pub enum MapEngineError {
        /// A referenced source, layer, image, marker, or popup does not exist.
        UnknownHandle { handle: String } =>
            "map engine handle {handle} is unknown",
        /// The engine refused the command.
        Rejected { message: String } =>
            "map engine rejected command: {message}",
        /// The map instance was already destroyed.
        Destroyed =>
            "map instance has been destroyed",
    }
}

/// Port for the imperative map rendering engine.
#[cfg_attr(test, mockall::automock)]
pub trait MapEngine: Send + Sync {
    /// Register a style image.
    fn add_image(&self, id: StyleId, image: &RgbaImage) -> Result<(), MapEngineError>;

    /// Replace the pixels of a registered style image.
    fn update_image(&self, id: StyleId, image: &RgbaImage) -> Result<(), MapEngineError>;

    /// Register a GeoJSON source with its initial data.
    fn add_source(&self, id: StyleId, data: &FeatureCollection) -> Result<(), MapEngineError>;

    /// Add a layer drawing an existing source.
    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapEngineError>;

    /// Replace a source's data wholesale.
    fn set_source_data(&self, id: StyleId, data: &FeatureCollection)
    -> Result<(), MapEngineError>;

    /// Place a marker and return its handle.
    fn add_marker(&self, marker: &MarkerSpec) -> Result<MarkerId, MapEngineError>;

    /// Remove a marker.
    fn remove_marker(&self, id: MarkerId) -> Result<(), MapEngineError>;

    /// Attach a popup to a marker; popups start closed.
    fn add_popup(&self, popup: &PopupSpec) -> Result<PopupId, MapEngineError>;

    /// Open or close a popup.
    fn set_popup_open(&self, id: PopupId, open: bool) -> Result<(), MapEngineError>;

    /// Remove a popup.
    fn remove_popup(&self, id: PopupId) -> Result<(), MapEngineError>;

    /// Start a camera animation.
    fn fly_to(&self, camera: &FlyTo) -> Result<(), MapEngineError>;

    /// Move the camera so `bounds` is visible with `padding_px` margin.
    fn fit_bounds(&self, bounds: Bounds, padding_px: u32) -> Result<(), MapEngineError>;

    /// Constrain zooming; `None` lifts every bound.
    fn set_zoom_bounds(&self, range: Option<ZoomRange>) -> Result<(), MapEngineError>;

    /// Enable or disable pointer interaction (drag, scroll and pinch zoom).
    fn set_interactive(&self, enabled: bool) -> Result<(), MapEngineError>;

    /// Count rendered features of `layers` under `point`.
    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: &[StyleId],
    ) -> Result<usize, MapEngineError>;

    /// Ask the engine to schedule another frame.
    fn trigger_repaint(&self);

    /// Tear the map instance down.
    fn destroy(&self) -> Result<(), MapEngineError>;
}

/// Port for creating map instances, including nested popup maps.
#[cfg_attr(test, mockall::automock)]
pub trait MapFactory: Send + Sync {
    /// Create a map instance configured by `options`.
    fn create_map(&self, options: &MapOptions) -> Result<Arc<dyn MapEngine>, MapEngineError>;
}
