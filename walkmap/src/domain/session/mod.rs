//! Map session orchestration.
//!
//! A session owns the selection store, the camera transition guard and the
//! render synchronizer for one map, and routes engine events to them. State
//! sits behind a mutex that is released before any port call is awaited, so
//! overlapping searches interleave freely and the generation check at install
//! time decides which one wins.

use std::sync::{Arc, Mutex, MutexGuard};

use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    FlyTo, ImageSource, MapEngineError, MarkerId, PointSource, PopupId, RouteFetcher, ScreenPoint,
};
use crate::domain::{
    Admission, CameraTransitionGuard, Coordinate, GeocodeError, GeocodeResult, Generation,
    InstallOutcome, RenderSynchronizer, SelectionChange, SelectionError, SelectionStore, Settle,
};

mod pipeline;
mod runtime;

pub use runtime::{MapSessionConfig, MapSessionPorts};

/// Events delivered by the map engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The map finished loading its style.
    Load,
    /// Pointer click on the map canvas.
    Click {
        /// Pointer position.
        point: ScreenPoint,
    },
    /// The camera stopped moving.
    MoveEnd,
    /// A destination marker was clicked.
    MarkerClicked {
        /// Handle of the clicked marker.
        marker: MarkerId,
    },
    /// The user closed a destination popup.
    PopupClosed {
        /// Handle of the closed popup.
        popup: PopupId,
    },
    /// The engine is about to draw a frame.
    RenderFrame,
    /// The geocoder produced a search result.
    GeocodeResult(GeocodeResult),
}

/// What a search request led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Destinations were installed and the shortest route selected.
    Installed {
        /// Cycle that produced the set.
        generation: Generation,
        /// Number of destinations installed.
        destinations: usize,
        /// Index of the shortest route.
        selected_index: usize,
    },
    /// The cycle finished without any destination.
    Empty {
        /// Cycle that came back empty.
        generation: Generation,
    },
    /// A newer cycle started while this one was fetching.
    Stale {
        /// Cycle the results were fetched for.
        received: Generation,
        /// Cycle in progress when they arrived.
        current: Generation,
    },
    /// The camera was moving; the search was dropped.
    Rejected,
    /// The camera was moving; the search runs once it settles.
    Deferred,
}

/// How [`MapSession::dispatch`] handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Sources, layers and the pulsing image were installed.
    Loaded,
    /// A geocode result ran a search.
    Search(SearchOutcome),
    /// A click changed the selected destination.
    Selection(SelectionChange),
    /// The camera settled and input was restored.
    Unlocked,
    /// Pointer input arrived while the camera was locked.
    InputLocked,
    /// The centre indicator advanced one frame.
    Frame,
    /// The event had no effect.
    Ignored,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Current search cycle.
    pub generation: Generation,
    /// Current search centre.
    pub center: Coordinate,
    /// Number of installed destinations.
    pub destinations: usize,
    /// Selected destination, if any.
    pub selected_index: Option<usize>,
    /// Whether the camera guard holds the input lock.
    pub locked: bool,
    /// Markers placed for the current cycle.
    pub markers: usize,
    /// Indices whose popups are open.
    pub open_popups: Vec<usize>,
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A search arrived before [`MapEvent::Load`].
    #[error("map has not finished loading")]
    NotLoaded,
    /// The geocode payload carried no usable centre.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// A selection transition was refused.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The map engine failed a command.
    #[error(transparent)]
    Engine(#[from] MapEngineError),
    /// The state mutex was poisoned.
    #[error("session state unavailable: {0}")]
    StateUnavailable(String),
}

struct SessionState {
    loaded: bool,
    center: Coordinate,
    store: SelectionStore,
    guard: CameraTransitionGuard,
    render: RenderSynchronizer,
}

impl SessionState {
    fn apply_selection(&mut self) -> Result<(), MapEngineError> {
        self.render.apply_selection(self.store.selection())
    }
}

/// Interaction core for one map.
pub struct MapSession {
    points: Arc<dyn PointSource>,
    images: Arc<dyn ImageSource>,
    routes: Arc<dyn RouteFetcher>,
    clock: Arc<dyn Clock>,
    config: MapSessionConfig,
    state: Mutex<SessionState>,
}

impl MapSession {
    /// Session over `ports`; nothing is drawn until [`MapEvent::Load`].
    #[must_use]
    pub fn new(ports: MapSessionPorts, clock: Arc<dyn Clock>, config: MapSessionConfig) -> Self {
        let render = RenderSynchronizer::new(ports.engine, ports.factory, config.style.clone());
        let state = SessionState {
            loaded: false,
            center: config.initial_center,
            store: SelectionStore::new(),
            guard: CameraTransitionGuard::new(config.fly_duration, config.reentry),
            render,
        };
        Self {
            points: ports.points,
            images: ports.images,
            routes: ports.routes,
            clock,
            config,
            state: Mutex::new(state),
        }
    }

    /// Configuration the session was built with.
    #[must_use]
    pub fn config(&self) -> &MapSessionConfig {
        &self.config
    }

    /// Handle one engine event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a geocode payload carries no usable
    /// coordinate, a search arrives before the map loaded, or the engine
    /// rejects a command.
    pub async fn dispatch(&self, event: MapEvent) -> Result<Dispatch, SessionError> {
        match event {
            MapEvent::Load => self.load(),
            MapEvent::GeocodeResult(result) => {
                let target = result.target()?;
                Ok(Dispatch::Search(self.search(target).await?))
            }
            MapEvent::Click { point } => self.background_click(point),
            MapEvent::MarkerClicked { marker } => self.marker_clicked(marker),
            MapEvent::PopupClosed { popup } => self.popup_closed(popup),
            MapEvent::MoveEnd => self.settle().await,
            MapEvent::RenderFrame => self.render_frame(),
        }
    }

    /// Run one search cycle around `target`.
    ///
    /// The camera locks, the previous cycle is torn down and the camera starts
    /// flying before any fetch is issued. Results are installed only if no
    /// newer cycle began in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoaded`] before the map loaded, or the
    /// engine failure that interrupted the cycle.
    pub async fn search(&self, target: Coordinate) -> Result<SearchOutcome, SessionError> {
        let generation = {
            let mut state = self.lock_state()?;
            if !state.loaded {
                return Err(SessionError::NotLoaded);
            }
            match state.guard.try_lock(self.clock.utc(), target) {
                Admission::Accepted => {}
                Admission::Rejected => {
                    info!(target = %target, "camera is moving; dropping search");
                    return Ok(SearchOutcome::Rejected);
                }
                Admission::Deferred => {
                    info!(target = %target, "camera is moving; search parked for replay");
                    return Ok(SearchOutcome::Deferred);
                }
            }

            match self.start_transition(&mut state, target) {
                Ok(generation) => generation,
                Err(error) => {
                    self.abort_transition(&mut state, &error);
                    return Err(error.into());
                }
            }
        };

        let destinations = pipeline::resolve_destinations(
            self.points.as_ref(),
            self.images.as_ref(),
            self.routes.as_ref(),
            target,
        )
        .await;

        let mut state = self.lock_state()?;
        match state.store.install(generation, destinations) {
            InstallOutcome::Installed {
                destinations,
                selected_index,
            } => {
                let SessionState { store, render, .. } = &mut *state;
                if let Some(selection) = store.selection() {
                    render.build(selection, target)?;
                }
                info!(
                    generation = generation.value(),
                    destinations, selected_index, "installed search results"
                );
                Ok(SearchOutcome::Installed {
                    generation,
                    destinations,
                    selected_index,
                })
            }
            InstallOutcome::Empty => {
                info!(generation = generation.value(), "search found no destinations");
                Ok(SearchOutcome::Empty { generation })
            }
            InstallOutcome::Stale { received, current } => {
                debug!(
                    received = received.value(),
                    current = current.value(),
                    "discarding results of a superseded search"
                );
                Ok(SearchOutcome::Stale { received, current })
            }
        }
    }

    /// Current session state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StateUnavailable`] if the state lock is
    /// poisoned.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let state = self.lock_state()?;
        Ok(SessionSnapshot {
            generation: state.store.generation(),
            center: state.center,
            destinations: state.store.selection().map_or(0, |selection| selection.len()),
            selected_index: state.store.selected_index(),
            locked: state.guard.is_locked(),
            markers: state.render.marker_count(),
            open_popups: state.render.open_popups(),
        })
    }

    /// Lock the camera, start a new cycle and begin the fly-to.
    fn start_transition(
        &self,
        state: &mut SessionState,
        target: Coordinate,
    ) -> Result<Generation, MapEngineError> {
        state.render.lock_camera()?;
        let generation = state.store.begin_search();
        state.center = target;
        state.render.teardown()?;
        state.render.show_center(target)?;
        state.render.fly_to(&FlyTo {
            center: target,
            zoom: self.config.fly_zoom,
            duration: self.config.fly_duration,
        })?;
        Ok(generation)
    }

    /// Without a fly-to no settle event arrives, so release the lock here.
    fn abort_transition(&self, state: &mut SessionState, cause: &MapEngineError) {
        state.guard.abort();
        warn!(error = %cause, kind = cause.kind(), "search aborted before the camera moved");
        if let Err(error) = state.render.unlock_camera(self.config.zoom_range) {
            warn!(error = %error, kind = error.kind(), "failed to restore camera input");
        }
    }

    fn load(&self) -> Result<Dispatch, SessionError> {
        let mut state = self.lock_state()?;
        if state.loaded {
            return Ok(Dispatch::Ignored);
        }
        state.render.install_layers(state.center)?;
        state.loaded = true;
        Ok(Dispatch::Loaded)
    }

    fn background_click(&self, point: ScreenPoint) -> Result<Dispatch, SessionError> {
        let mut state = self.lock_state()?;
        if state.guard.is_locked() {
            return Ok(Dispatch::InputLocked);
        }
        if state.render.hits_at(point)? > 0 {
            return Ok(Dispatch::Ignored);
        }
        let change = state.store.clear();
        if !change.is_noop() {
            state.apply_selection()?;
        }
        Ok(Dispatch::Selection(change))
    }

    fn marker_clicked(&self, marker: MarkerId) -> Result<Dispatch, SessionError> {
        let mut state = self.lock_state()?;
        if state.guard.is_locked() {
            return Ok(Dispatch::InputLocked);
        }
        let Some(index) = state.render.marker_index(marker) else {
            debug!(marker = marker.get(), "ignoring click on a torn-down marker");
            return Ok(Dispatch::Ignored);
        };
        let change = state.store.select(index)?;
        if !change.is_noop() {
            state.apply_selection()?;
        }
        Ok(Dispatch::Selection(change))
    }

    fn popup_closed(&self, popup: PopupId) -> Result<Dispatch, SessionError> {
        let mut state = self.lock_state()?;
        let Some(index) = state.render.popup_closed(popup)? else {
            return Ok(Dispatch::Ignored);
        };
        if state.store.selected_index() != Some(index) {
            return Ok(Dispatch::Ignored);
        }
        let change = state.store.clear();
        state.apply_selection()?;
        Ok(Dispatch::Selection(change))
    }

    async fn settle(&self) -> Result<Dispatch, SessionError> {
        let replay = {
            let mut state = self.lock_state()?;
            match state.guard.settle(self.clock.utc()) {
                Settle::NotLocked => return Ok(Dispatch::Ignored),
                Settle::StillLocked { remaining } => {
                    debug!(
                        remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                        "camera settled before the fly duration elapsed"
                    );
                    return Ok(Dispatch::Ignored);
                }
                Settle::Released { replay } => {
                    state.render.unlock_camera(self.config.zoom_range)?;
                    replay
                }
            }
        };

        match replay {
            Some(target) => {
                info!(target = %target, "replaying search parked during camera move");
                Ok(Dispatch::Search(self.search(target).await?))
            }
            None => Ok(Dispatch::Unlocked),
        }
    }

    fn render_frame(&self) -> Result<Dispatch, SessionError> {
        let mut state = self.lock_state()?;
        if !state.loaded {
            return Ok(Dispatch::Ignored);
        }
        state.render.render_frame(self.clock.utc())?;
        Ok(Dispatch::Frame)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::StateUnavailable("map session state poisoned".to_owned()))
    }
}
