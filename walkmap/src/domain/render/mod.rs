//! Render synchronizer: pushes selection state into the map engine.
//!
//! The synchronizer owns a handle table with one marker and one popup per
//! installed destination, indexed by destination position. Handles are
//! created once per cycle by [`RenderSynchronizer::build`] and destroyed
//! wholesale by [`RenderSynchronizer::teardown`]; they are never reused
//! across cycles. The `routes` source is rewritten in full on every
//! selection change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{
    FlyTo, HERE, MapEngine, MapEngineError, MapFactory, MarkerId, MarkerSpec, PULSING_DOT,
    PopupId, PopupSpec, ROUTES, ScreenPoint, ZoomRange,
};
use crate::domain::{Bounds, Coordinate, FeatureCollection, PulsingDot, SelectionSet};

mod style;
#[cfg(test)]
mod tests;

pub use style::{RenderStyle, here_features, route_features};

/// Engine handles owned for one destination.
struct PointHandles {
    marker: MarkerId,
    popup: PopupId,
    coordinate: Coordinate,
    popup_open: bool,
    detail_map: Option<Arc<dyn MapEngine>>,
}

/// Translates selection state into map engine commands.
pub struct RenderSynchronizer {
    engine: Arc<dyn MapEngine>,
    factory: Arc<dyn MapFactory>,
    style: RenderStyle,
    handles: Vec<PointHandles>,
    pulse: PulsingDot,
}

impl RenderSynchronizer {
    /// Synchroniser with an empty handle table.
    #[must_use]
    pub fn new(engine: Arc<dyn MapEngine>, factory: Arc<dyn MapFactory>, style: RenderStyle) -> Self {
        Self {
            engine,
            factory,
            style,
            handles: Vec::new(),
            pulse: PulsingDot::default(),
        }
    }

    /// Register the pulsing icon plus the `here` and `routes` layers.
    ///
    /// # Errors
    ///
    /// Propagates the first engine failure.
    pub fn install_layers(&self, center: Coordinate) -> Result<(), MapEngineError> {
        self.engine.add_image(PULSING_DOT, self.pulse.pixels())?;
        self.engine.add_source(HERE, &here_features(center))?;
        self.engine.add_layer(&style::here_layer())?;
        self.engine.add_source(ROUTES, &FeatureCollection::empty())?;
        self.engine.add_layer(&style::routes_layer())
    }

    /// Disable pointer interaction and lift zoom bounds for a fly-to.
    ///
    /// # Errors
    ///
    /// Propagates the first engine failure.
    pub fn lock_camera(&self) -> Result<(), MapEngineError> {
        self.engine.set_interactive(false)?;
        self.engine.set_zoom_bounds(None)
    }

    /// Restore `zoom_range` and pointer interaction after a fly-to.
    ///
    /// # Errors
    ///
    /// Propagates the first engine failure.
    pub fn unlock_camera(&self, zoom_range: ZoomRange) -> Result<(), MapEngineError> {
        self.engine.set_zoom_bounds(Some(zoom_range))?;
        self.engine.set_interactive(true)
    }

    /// Start the camera animation towards a new centre.
    ///
    /// # Errors
    ///
    /// Propagates the engine failure.
    pub fn fly_to(&self, camera: &FlyTo) -> Result<(), MapEngineError> {
        self.engine.fly_to(camera)
    }

    /// Move the centre indicator.
    ///
    /// # Errors
    ///
    /// Propagates the engine failure.
    pub fn show_center(&self, center: Coordinate) -> Result<(), MapEngineError> {
        self.engine.set_source_data(HERE, &here_features(center))
    }

    /// Destroy every marker, popup and nested map, then blank the routes.
    ///
    /// Every handle is released even when one removal fails; the first error
    /// is reported.
    ///
    /// # Errors
    ///
    /// Returns the first engine failure encountered.
    pub fn teardown(&mut self) -> Result<(), MapEngineError> {
        let mut first_error = None;
        for handles in self.handles.drain(..) {
            if let Err(error) = release(self.engine.as_ref(), handles) {
                first_error.get_or_insert(error);
            }
        }
        let cleared = self
            .engine
            .set_source_data(ROUTES, &FeatureCollection::empty());
        match first_error {
            Some(error) => Err(error),
            None => cleared,
        }
    }

    /// Create the handles for a freshly installed set, draw it, open the
    /// selected popup and fit the camera around the candidates and `center`.
    ///
    /// # Errors
    ///
    /// Propagates the first engine failure; handles created so far stay in
    /// the table so the next teardown releases them.
    pub fn build(&mut self, selection: &SelectionSet, center: Coordinate) -> Result<(), MapEngineError> {
        if !self.handles.is_empty() {
            self.teardown()?;
        }

        let mut bounds = Bounds::around(center);
        for (index, destination) in selection.destinations().iter().enumerate() {
            let coordinate = destination.candidate.coordinate;
            bounds.extend(coordinate);

            let marker = self.engine.add_marker(&MarkerSpec {
                index: Some(index),
                coordinate,
                stop_click_propagation: true,
            })?;
            let popup = match self.engine.add_popup(&PopupSpec {
                index,
                marker,
                content: style::popup_content(index, destination),
            }) {
                Ok(popup) => popup,
                Err(error) => {
                    self.engine.remove_marker(marker)?;
                    return Err(error);
                }
            };
            self.handles.push(PointHandles {
                marker,
                popup,
                coordinate,
                popup_open: false,
                detail_map: None,
            });
        }

        self.apply_selection(Some(selection))?;
        self.engine.fit_bounds(bounds, self.style.fit_padding_px)
    }

    /// Rewrite the routes and popups for the current selection.
    ///
    /// Open popups are closed before the selected one opens, so at most one
    /// popup is ever open.
    ///
    /// # Errors
    ///
    /// Propagates the first engine failure.
    pub fn apply_selection(&mut self, selection: Option<&SelectionSet>) -> Result<(), MapEngineError> {
        let routes = selection.map_or_else(FeatureCollection::empty, |installed| {
            route_features(installed, &self.style)
        });
        self.engine.set_source_data(ROUTES, &routes)?;

        for handles in self.handles.iter_mut().filter(|handles| handles.popup_open) {
            close_popup(self.engine.as_ref(), handles)?;
        }

        match selection.and_then(SelectionSet::selected_index) {
            Some(index) => self.open_popup(index),
            None => Ok(()),
        }
    }

    /// Destination index of a current-cycle marker.
    #[must_use]
    pub fn marker_index(&self, marker: MarkerId) -> Option<usize> {
        self.handles
            .iter()
            .position(|handles| handles.marker == marker)
    }

    /// Record a popup closed by the user and unload its nested map.
    ///
    /// Returns the destination index when `popup` belongs to the current
    /// cycle; popups from torn-down cycles yield `None`.
    ///
    /// # Errors
    ///
    /// Propagates a failure destroying the nested map.
    pub fn popup_closed(&mut self, popup: PopupId) -> Result<Option<usize>, MapEngineError> {
        let Some(index) = self
            .handles
            .iter()
            .position(|handles| handles.popup == popup)
        else {
            debug!(popup = popup.get(), "ignoring close of a torn-down popup");
            return Ok(None);
        };
        if let Some(handles) = self.handles.get_mut(index) {
            handles.popup_open = false;
            unload_detail_map(handles)?;
        }
        Ok(Some(index))
    }

    /// Count route or centre features under a pointer position.
    ///
    /// # Errors
    ///
    /// Propagates the engine failure.
    pub fn hits_at(&self, point: ScreenPoint) -> Result<usize, MapEngineError> {
        self.engine.query_rendered_features(point, &[ROUTES, HERE])
    }

    /// Rasterise the pulsing indicator for `now` and request a repaint.
    ///
    /// # Errors
    ///
    /// Propagates the engine failure.
    pub fn render_frame(&mut self, now: DateTime<Utc>) -> Result<(), MapEngineError> {
        let pixels = self.pulse.render_at(now);
        self.engine.update_image(PULSING_DOT, pixels)?;
        self.engine.trigger_repaint();
        Ok(())
    }

    /// Indices whose popups are currently open.
    #[must_use]
    pub fn open_popups(&self) -> Vec<usize> {
        self.handles
            .iter()
            .enumerate()
            .filter(|(_, handles)| handles.popup_open)
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of markers placed for the current cycle.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.handles.len()
    }

    fn open_popup(&mut self, index: usize) -> Result<(), MapEngineError> {
        let handles = self
            .handles
            .get_mut(index)
            .ok_or_else(|| MapEngineError::unknown_handle(format!("popup #{index}")))?;
        self.engine.set_popup_open(handles.popup, true)?;
        handles.popup_open = true;

        let detail = self
            .factory
            .create_map(&self.style.detail_map(handles.coordinate))?;
        detail.add_marker(&MarkerSpec {
            index: None,
            coordinate: handles.coordinate,
            stop_click_propagation: false,
        })?;
        handles.detail_map = Some(detail);
        Ok(())
    }
}

fn close_popup(engine: &dyn MapEngine, handles: &mut PointHandles) -> Result<(), MapEngineError> {
    engine.set_popup_open(handles.popup, false)?;
    handles.popup_open = false;
    unload_detail_map(handles)
}

fn unload_detail_map(handles: &mut PointHandles) -> Result<(), MapEngineError> {
    match handles.detail_map.take() {
        Some(detail) => detail.destroy(),
        None => Ok(()),
    }
}

/// Release one destination's handles, attempting every removal and keeping
/// the first error.
fn release(engine: &dyn MapEngine, mut handles: PointHandles) -> Result<(), MapEngineError> {
    let unloaded = unload_detail_map(&mut handles);
    let popup = engine.remove_popup(handles.popup);
    let marker = engine.remove_marker(handles.marker);
    unloaded.and(popup).and(marker)
}
