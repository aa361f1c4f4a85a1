//! In-memory map engine that records every command for assertions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;

use crate::domain::ports::{
    FlyTo, LayerSpec, MapEngine, MapEngineError, MapFactory, MapOptions, MarkerId, MarkerSpec,
    PopupContent, PopupId, PopupSpec, ScreenPoint, StyleId, ZoomRange,
};
use crate::domain::{Bounds, FeatureCollection};

/// One recorded engine command.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `add_image` for the id.
    AddImage(StyleId),
    /// `update_image` for the id.
    UpdateImage(StyleId),
    /// `add_source` for the id.
    AddSource(StyleId),
    /// `add_layer` for the layer id.
    AddLayer(StyleId),
    /// `set_source_data` for the id.
    SetSourceData(StyleId),
    /// `add_marker`, with the issued handle.
    AddMarker(MarkerId),
    /// `remove_marker`.
    RemoveMarker(MarkerId),
    /// `add_popup`, with the issued handle.
    AddPopup(PopupId),
    /// `set_popup_open`.
    SetPopupOpen(PopupId, bool),
    /// `remove_popup`.
    RemovePopup(PopupId),
    /// `fly_to` with the full camera command.
    FlyTo(FlyTo),
    /// `fit_bounds` with bounds and padding.
    FitBounds(Bounds, u32),
    /// `set_zoom_bounds`.
    SetZoomBounds(Option<ZoomRange>),
    /// `set_interactive`.
    SetInteractive(bool),
    /// `query_rendered_features` at the point.
    QueryRenderedFeatures(ScreenPoint),
    /// `trigger_repaint`.
    TriggerRepaint,
    /// `destroy`.
    Destroy,
}

#[derive(Debug, Clone)]
struct RecordedPopup {
    spec: PopupSpec,
    open: bool,
}

struct EngineState {
    next_id: u64,
    calls: Vec<EngineCall>,
    sources: HashMap<StyleId, FeatureCollection>,
    layers: Vec<LayerSpec>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    popups: BTreeMap<PopupId, RecordedPopup>,
    zoom_bounds: Option<ZoomRange>,
    interactive: bool,
    hits: usize,
    destroyed: bool,
}

/// Map engine double holding sources, markers and popups in memory.
pub struct RecordingMapEngine {
    state: Mutex<EngineState>,
}

impl Default for RecordingMapEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMapEngine {
    /// Live, interactive engine with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState {
                next_id: 1,
                calls: Vec::new(),
                sources: HashMap::new(),
                layers: Vec::new(),
                markers: BTreeMap::new(),
                popups: BTreeMap::new(),
                zoom_bounds: None,
                interactive: true,
                hits: 0,
                destroyed: false,
            }),
        }
    }

    /// Make `query_rendered_features` report `hits` features.
    pub fn set_hits(&self, hits: usize) {
        self.lock().hits = hits;
    }

    /// Every command recorded so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Forget the recorded commands, keeping engine state.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current data of source `id`.
    #[must_use]
    pub fn source(&self, id: StyleId) -> Option<FeatureCollection> {
        self.lock().sources.get(&id).cloned()
    }

    /// Layer registered under `id`.
    #[must_use]
    pub fn layer(&self, id: StyleId) -> Option<LayerSpec> {
        self.lock().layers.iter().find(|layer| layer.id == id).cloned()
    }

    /// Number of live markers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.lock().markers.len()
    }

    /// Specs of the live markers in handle order.
    #[must_use]
    pub fn markers(&self) -> Vec<MarkerSpec> {
        self.lock().markers.values().cloned().collect()
    }

    /// Live marker created for destination `index`.
    #[must_use]
    pub fn marker_for(&self, index: usize) -> Option<MarkerId> {
        self.lock()
            .markers
            .iter()
            .find(|(_, spec)| spec.index == Some(index))
            .map(|(id, _)| *id)
    }

    /// Live popup created for destination `index`.
    #[must_use]
    pub fn popup_for(&self, index: usize) -> Option<PopupId> {
        self.lock()
            .popups
            .iter()
            .find(|(_, popup)| popup.spec.index == index)
            .map(|(id, _)| *id)
    }

    /// Number of live popups.
    #[must_use]
    pub fn popup_count(&self) -> usize {
        self.lock().popups.len()
    }

    /// Content of the live popup for destination `index`.
    #[must_use]
    pub fn popup_content(&self, index: usize) -> Option<PopupContent> {
        self.lock()
            .popups
            .values()
            .find(|popup| popup.spec.index == index)
            .map(|popup| popup.spec.content.clone())
    }

    /// Destination indices whose popups are open, ascending.
    #[must_use]
    pub fn open_popups(&self) -> Vec<usize> {
        let mut open: Vec<usize> = self
            .lock()
            .popups
            .values()
            .filter(|popup| popup.open)
            .map(|popup| popup.spec.index)
            .collect();
        open.sort_unstable();
        open
    }

    /// Whether pointer interaction is enabled.
    #[must_use]
    pub fn interactive(&self) -> bool {
        self.lock().interactive
    }

    /// Zoom bounds last set; `None` when lifted.
    #[must_use]
    pub fn zoom_bounds(&self) -> Option<ZoomRange> {
        self.lock().zoom_bounds
    }

    /// Every fly-to issued, oldest first.
    #[must_use]
    pub fn fly_tos(&self) -> Vec<FlyTo> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::FlyTo(camera) => Some(*camera),
                _ => None,
            })
            .collect()
    }

    /// Every `fit_bounds` issued, oldest first.
    #[must_use]
    pub fn fitted_bounds(&self) -> Vec<(Bounds, u32)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::FitBounds(bounds, padding) => Some((*bounds, *padding)),
                _ => None,
            })
            .collect()
    }

    /// Number of repaint requests.
    #[must_use]
    pub fn repaints(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, EngineCall::TriggerRepaint))
            .count()
    }

    /// Whether `destroy` was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// `(selected, color, width)` of every feature in the `routes` source.
    #[must_use]
    pub fn route_styles(&self) -> Vec<(bool, String, f64)> {
        self.source(crate::domain::ports::ROUTES)
            .map(|routes| {
                routes
                    .features
                    .iter()
                    .map(|feature| {
                        let selected = feature
                            .property("selected")
                            .and_then(serde_json::Value::as_bool)
                            .unwrap_or(false);
                        let color = feature
                            .property("color")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_owned();
                        let width = feature
                            .property("width")
                            .and_then(serde_json::Value::as_f64)
                            .unwrap_or_default();
                        (selected, color, width)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("engine mutex"),
        }
    }

    fn live(&self, call: EngineCall) -> Result<MutexGuard<'_, EngineState>, MapEngineError> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(MapEngineError::destroyed());
        }
        state.calls.push(call);
        Ok(state)
    }

    fn record(&self, call: EngineCall) -> Result<(), MapEngineError> {
        self.live(call).map(drop)
    }
}

impl EngineState {
    fn issue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl MapEngine for RecordingMapEngine {
    fn add_image(&self, id: StyleId, _image: &RgbaImage) -> Result<(), MapEngineError> {
        self.record(EngineCall::AddImage(id))
    }

    fn update_image(&self, id: StyleId, _image: &RgbaImage) -> Result<(), MapEngineError> {
        self.record(EngineCall::UpdateImage(id))
    }

    fn add_source(&self, id: StyleId, data: &FeatureCollection) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::AddSource(id))?;
        state.sources.insert(id, data.clone());
        Ok(())
    }

    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::AddLayer(layer.id))?;
        if !state.sources.contains_key(&layer.source) {
            return Err(MapEngineError::unknown_handle(layer.source.as_str()));
        }
        state.layers.push(layer.clone());
        Ok(())
    }

    fn set_source_data(
        &self,
        id: StyleId,
        data: &FeatureCollection,
    ) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::SetSourceData(id))?;
        match state.sources.get_mut(&id) {
            Some(source) => {
                *source = data.clone();
                Ok(())
            }
            None => Err(MapEngineError::unknown_handle(id.as_str())),
        }
    }

    fn add_marker(&self, marker: &MarkerSpec) -> Result<MarkerId, MapEngineError> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(MapEngineError::destroyed());
        }
        let id = MarkerId::new(state.issue_id());
        state.calls.push(EngineCall::AddMarker(id));
        state.markers.insert(id, marker.clone());
        Ok(id)
    }

    fn remove_marker(&self, id: MarkerId) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::RemoveMarker(id))?;
        state
            .markers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| MapEngineError::unknown_handle(format!("marker {}", id.get())))
    }

    fn add_popup(&self, popup: &PopupSpec) -> Result<PopupId, MapEngineError> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(MapEngineError::destroyed());
        }
        if !state.markers.contains_key(&popup.marker) {
            return Err(MapEngineError::unknown_handle(format!(
                "marker {}",
                popup.marker.get()
            )));
        }
        let id = PopupId::new(state.issue_id());
        state.calls.push(EngineCall::AddPopup(id));
        state.popups.insert(
            id,
            RecordedPopup {
                spec: popup.clone(),
                open: false,
            },
        );
        Ok(id)
    }

    fn set_popup_open(&self, id: PopupId, open: bool) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::SetPopupOpen(id, open))?;
        match state.popups.get_mut(&id) {
            Some(popup) => {
                popup.open = open;
                Ok(())
            }
            None => Err(MapEngineError::unknown_handle(format!("popup {}", id.get()))),
        }
    }

    fn remove_popup(&self, id: PopupId) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::RemovePopup(id))?;
        state
            .popups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| MapEngineError::unknown_handle(format!("popup {}", id.get())))
    }

    fn fly_to(&self, camera: &FlyTo) -> Result<(), MapEngineError> {
        self.record(EngineCall::FlyTo(*camera))
    }

    fn fit_bounds(&self, bounds: Bounds, padding_px: u32) -> Result<(), MapEngineError> {
        self.record(EngineCall::FitBounds(bounds, padding_px))
    }

    fn set_zoom_bounds(&self, range: Option<ZoomRange>) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::SetZoomBounds(range))?;
        state.zoom_bounds = range;
        Ok(())
    }

    fn set_interactive(&self, enabled: bool) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::SetInteractive(enabled))?;
        state.interactive = enabled;
        Ok(())
    }

    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        _layers: &[StyleId],
    ) -> Result<usize, MapEngineError> {
        let state = self.live(EngineCall::QueryRenderedFeatures(point))?;
        Ok(state.hits)
    }

    fn trigger_repaint(&self) {
        self.lock().calls.push(EngineCall::TriggerRepaint);
    }

    fn destroy(&self) -> Result<(), MapEngineError> {
        let mut state = self.live(EngineCall::Destroy)?;
        state.destroyed = true;
        Ok(())
    }
}

/// Factory handing out [`RecordingMapEngine`] instances and keeping them for
/// inspection.
#[derive(Default)]
pub struct RecordingMapFactory {
    maps: Mutex<Vec<(MapOptions, Arc<RecordingMapEngine>)>>,
}

impl RecordingMapFactory {
    /// Factory that has created nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every map created so far, oldest first.
    #[must_use]
    pub fn maps(&self) -> Vec<(MapOptions, Arc<RecordingMapEngine>)> {
        self.lock().clone()
    }

    /// Number of maps created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.lock().len()
    }

    /// Maps that have not been destroyed yet.
    #[must_use]
    pub fn live_maps(&self) -> usize {
        self.lock()
            .iter()
            .filter(|(_, engine)| !engine.is_destroyed())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(MapOptions, Arc<RecordingMapEngine>)>> {
        match self.maps.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("factory mutex"),
        }
    }
}

impl MapFactory for RecordingMapFactory {
    fn create_map(&self, options: &MapOptions) -> Result<Arc<dyn MapEngine>, MapEngineError> {
        let engine = Arc::new(RecordingMapEngine::new());
        self.lock().push((options.clone(), Arc::clone(&engine)));
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    //! Guards on the recording double itself.

    use super::*;
    use crate::domain::Coordinate;

    #[test]
    fn destroyed_engine_rejects_and_records_nothing() {
        let engine = RecordingMapEngine::new();
        let image = RgbaImage::new(2, 2);
        engine.add_image(StyleId::new("dot"), &image).expect("live add");
        engine.destroy().expect("destroy");
        engine.clear_calls();

        let camera = FlyTo {
            center: Coordinate::new(-122.4165, 37.7554).expect("valid coordinate"),
            zoom: 14.0,
            duration: std::time::Duration::from_secs(3),
        };
        assert_eq!(engine.fly_to(&camera), Err(MapEngineError::destroyed()));
        assert_eq!(
            engine.update_image(StyleId::new("dot"), &image),
            Err(MapEngineError::destroyed())
        );
        assert!(engine.calls().is_empty());
        assert!(engine.fly_tos().is_empty());
    }
}
