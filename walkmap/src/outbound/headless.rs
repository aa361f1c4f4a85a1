//! Headless map engine that logs every command.
//!
//! Used by the command-line driver to run full search cycles without a
//! rendering surface. Handles are issued from a shared counter and tracked so
//! removal of an unknown handle reports the same error a real engine would.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;
use tracing::{debug, info};

use crate::domain::ports::{
    FlyTo, LayerSpec, MapEngine, MapEngineError, MapFactory, MapOptions, MarkerId, MarkerSpec,
    PopupId, PopupSpec, ScreenPoint, StyleId, ZoomRange,
};
use crate::domain::{Bounds, FeatureCollection};

/// First handle id issued by a fresh engine or factory.
const FIRST_ID: u64 = 1;

#[derive(Default)]
struct Handles {
    markers: BTreeSet<MarkerId>,
    popups: BTreeSet<PopupId>,
    destroyed: bool,
}

/// Map engine that records nothing but tracing events.
pub struct TracingMapEngine {
    label: String,
    ids: Arc<AtomicU64>,
    handles: Mutex<Handles>,
}

impl TracingMapEngine {
    /// Standalone engine with its own handle id space.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_ids(label, Arc::new(AtomicU64::new(FIRST_ID)))
    }

    fn with_ids(label: impl Into<String>, ids: Arc<AtomicU64>) -> Self {
        Self {
            label: label.into(),
            ids,
            handles: Mutex::new(Handles::default()),
        }
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    fn live(&self) -> Result<MutexGuard<'_, Handles>, MapEngineError> {
        let handles = self
            .handles
            .lock()
            .map_err(|_| MapEngineError::rejected("headless engine state poisoned"))?;
        if handles.destroyed {
            return Err(MapEngineError::destroyed());
        }
        Ok(handles)
    }

    fn ensure_live(&self) -> Result<(), MapEngineError> {
        self.live().map(drop)
    }
}

impl MapEngine for TracingMapEngine {
    fn add_image(&self, id: StyleId, image: &RgbaImage) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(map = %self.label, image = id.as_str(), width = image.width(), "add image");
        Ok(())
    }

    fn update_image(&self, id: StyleId, _image: &RgbaImage) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(map = %self.label, image = id.as_str(), "update image");
        Ok(())
    }

    fn add_source(&self, id: StyleId, data: &FeatureCollection) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(map = %self.label, source = id.as_str(), features = data.features.len(), "add source");
        Ok(())
    }

    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(map = %self.label, layer = layer.id.as_str(), kind = ?layer.kind, "add layer");
        Ok(())
    }

    fn set_source_data(
        &self,
        id: StyleId,
        data: &FeatureCollection,
    ) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        let payload = serde_json::to_string(data)
            .map_err(|error| MapEngineError::rejected(error.to_string()))?;
        debug!(map = %self.label, source = id.as_str(), payload = %payload, "set source data");
        Ok(())
    }

    fn add_marker(&self, marker: &MarkerSpec) -> Result<MarkerId, MapEngineError> {
        let mut handles = self.live()?;
        let id = MarkerId::new(self.next_id());
        handles.markers.insert(id);
        debug!(
            map = %self.label,
            marker = id.get(),
            index = ?marker.index,
            at = %marker.coordinate,
            "add marker"
        );
        Ok(id)
    }

    fn remove_marker(&self, id: MarkerId) -> Result<(), MapEngineError> {
        let mut handles = self.live()?;
        if !handles.markers.remove(&id) {
            return Err(MapEngineError::unknown_handle(format!("marker {}", id.get())));
        }
        debug!(map = %self.label, marker = id.get(), "remove marker");
        Ok(())
    }

    fn add_popup(&self, popup: &PopupSpec) -> Result<PopupId, MapEngineError> {
        let mut handles = self.live()?;
        if !handles.markers.contains(&popup.marker) {
            return Err(MapEngineError::unknown_handle(format!(
                "marker {}",
                popup.marker.get()
            )));
        }
        let id = PopupId::new(self.next_id());
        handles.popups.insert(id);
        debug!(
            map = %self.label,
            popup = id.get(),
            title = %popup.content.title,
            route_length_m = popup.content.route_length_m,
            "add popup"
        );
        Ok(id)
    }

    fn set_popup_open(&self, id: PopupId, open: bool) -> Result<(), MapEngineError> {
        let handles = self.live()?;
        if !handles.popups.contains(&id) {
            return Err(MapEngineError::unknown_handle(format!("popup {}", id.get())));
        }
        info!(map = %self.label, popup = id.get(), open, "toggle popup");
        Ok(())
    }

    fn remove_popup(&self, id: PopupId) -> Result<(), MapEngineError> {
        let mut handles = self.live()?;
        if !handles.popups.remove(&id) {
            return Err(MapEngineError::unknown_handle(format!("popup {}", id.get())));
        }
        debug!(map = %self.label, popup = id.get(), "remove popup");
        Ok(())
    }

    fn fly_to(&self, camera: &FlyTo) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        info!(
            map = %self.label,
            center = %camera.center,
            zoom = camera.zoom,
            duration_ms = u64::try_from(camera.duration.as_millis()).unwrap_or(u64::MAX),
            "fly to"
        );
        Ok(())
    }

    fn fit_bounds(&self, bounds: Bounds, padding_px: u32) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        info!(map = %self.label, bounds = ?bounds.to_array(), padding_px, "fit bounds");
        Ok(())
    }

    fn set_zoom_bounds(&self, range: Option<ZoomRange>) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(
            map = %self.label,
            min = range.map(|bounds| bounds.min),
            max = range.map(|bounds| bounds.max),
            "set zoom bounds"
        );
        Ok(())
    }

    fn set_interactive(&self, enabled: bool) -> Result<(), MapEngineError> {
        self.ensure_live()?;
        debug!(map = %self.label, enabled, "set interactive");
        Ok(())
    }

    fn query_rendered_features(
        &self,
        _point: ScreenPoint,
        _layers: &[StyleId],
    ) -> Result<usize, MapEngineError> {
        self.ensure_live()?;
        Ok(0)
    }

    fn trigger_repaint(&self) {}

    fn destroy(&self) -> Result<(), MapEngineError> {
        let mut handles = self.live()?;
        handles.destroyed = true;
        handles.markers.clear();
        handles.popups.clear();
        debug!(map = %self.label, "destroy map");
        Ok(())
    }
}

/// Factory producing [`TracingMapEngine`] instances that share one id space.
pub struct TracingMapFactory {
    ids: Arc<AtomicU64>,
    maps: AtomicU64,
}

impl TracingMapFactory {
    /// Factory whose first engine issues handle [`FIRST_ID`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: Arc::new(AtomicU64::new(FIRST_ID)),
            maps: AtomicU64::new(0),
        }
    }
}

impl Default for TracingMapFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MapFactory for TracingMapFactory {
    fn create_map(&self, options: &MapOptions) -> Result<Arc<dyn MapEngine>, MapEngineError> {
        let ordinal = self.maps.fetch_add(1, Ordering::Relaxed);
        let label = format!("map-{ordinal}");
        info!(
            map = %label,
            style = %options.style,
            center = %options.center,
            zoom = options.zoom,
            interactive = options.interactive,
            "create map"
        );
        Ok(Arc::new(TracingMapEngine::with_ids(label, Arc::clone(&self.ids))))
    }
}
