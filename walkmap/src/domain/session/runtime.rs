//! Port bundle and configuration for a map session.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{
    ImageSource, MapEngine, MapFactory, MapOptions, PointSource, RouteFetcher, ZoomRange,
};
use crate::domain::{Coordinate, ReentryPolicy, RenderStyle};

/// Port bundle required by [`super::MapSession`].
pub struct MapSessionPorts {
    /// Nearby candidate lookup.
    pub points: Arc<dyn PointSource>,
    /// Candidate image lookup.
    pub images: Arc<dyn ImageSource>,
    /// Walking route lookup.
    pub routes: Arc<dyn RouteFetcher>,
    /// The session's map instance.
    pub engine: Arc<dyn MapEngine>,
    /// Factory for nested popup maps.
    pub factory: Arc<dyn MapFactory>,
}

impl MapSessionPorts {
    /// Build a strongly-typed session port bundle.
    #[must_use]
    pub fn new(
        points: Arc<dyn PointSource>,
        images: Arc<dyn ImageSource>,
        routes: Arc<dyn RouteFetcher>,
        engine: Arc<dyn MapEngine>,
        factory: Arc<dyn MapFactory>,
    ) -> Self {
        Self {
            points,
            images,
            routes,
            engine,
            factory,
        }
    }
}

/// Camera and interaction settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSessionConfig {
    /// Centre shown before the first search.
    pub initial_center: Coordinate,
    /// Zoom shown before the first search.
    pub initial_zoom: f64,
    /// Fly-to animation length; also the input lock window.
    pub fly_duration: Duration,
    /// Zoom the camera flies to for a new search.
    pub fly_zoom: f64,
    /// Zoom bounds restored once the camera settles.
    pub zoom_range: ZoomRange,
    /// Handling of searches that arrive while the camera is moving.
    pub reentry: ReentryPolicy,
    /// Route colours and popup map settings.
    pub style: RenderStyle,
    /// Style URL of the main map.
    pub map_style: String,
}

impl MapSessionConfig {
    /// Defaults centred on `initial_center`.
    #[must_use]
    pub fn centered_on(initial_center: Coordinate) -> Self {
        Self {
            initial_center,
            initial_zoom: 5.0,
            fly_duration: Duration::from_millis(3_000),
            fly_zoom: 14.0,
            zoom_range: ZoomRange {
                min: 0.0,
                max: 15.0,
            },
            reentry: ReentryPolicy::Drop,
            style: RenderStyle::default(),
            map_style: "mapbox://styles/mapbox/light-v11".to_owned(),
        }
    }

    /// Options for creating the session's main map.
    #[must_use]
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            style: self.map_style.clone(),
            center: self.initial_center,
            zoom: self.initial_zoom,
            zoom_range: self.zoom_range,
            interactive: true,
        }
    }
}
