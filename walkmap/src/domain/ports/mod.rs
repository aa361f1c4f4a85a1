//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod image_source;
mod map_engine;
mod point_source;
mod route_fetcher;

#[cfg(test)]
pub use image_source::MockImageSource;
pub use image_source::{FixtureImageSource, ImageSource, ImageSourceError};
#[cfg(test)]
pub use map_engine::{MockMapEngine, MockMapFactory};
pub use map_engine::{
    FlyTo, HERE, LayerKind, LayerSpec, MapEngine, MapEngineError, MapFactory, MapOptions,
    MarkerId, MarkerSpec, PULSING_DOT, PopupContent, PopupId, PopupSpec, ROUTES, ScreenPoint,
    StyleId, ZoomRange,
};
#[cfg(test)]
pub use point_source::MockPointSource;
pub use point_source::{FixturePointSource, PointSource, PointSourceError};
#[cfg(test)]
pub use route_fetcher::MockRouteFetcher;
pub use route_fetcher::{FixtureRouteFetcher, RouteFetchError, RouteFetcher};
