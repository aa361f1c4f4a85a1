//! Domain primitives, state machines and orchestration.
//!
//! Purpose: keep every rule about search cycles, selection and camera
//! locking free of transport and rendering details. Adapters reach the domain
//! only through the traits in [`ports`].
//!
//! Public surface:
//! - Coordinate / Bounds — validated WGS84 values and camera boxes.
//! - GeocodeResult — geocoder payload and its target coordinate.
//! - CandidatePoint / RouteRecord / Destination — one cycle's resolved data.
//! - SelectionStore — installed set, selected index and generation token.
//! - CameraTransitionGuard — input lock held while the camera flies.
//! - PulsingDot — animated centre indicator.
//! - RenderSynchronizer — pushes selection state into the map engine.
//! - MapSession — wires the above together and dispatches map events.

pub mod coordinate;
pub mod destination;
pub mod geocode;
pub mod geojson;
pub mod ports;
pub mod pulse;
pub mod render;
pub mod selection;
pub mod session;
pub mod transition;

pub use self::coordinate::{Bounds, Coordinate, CoordinateValidationError};
pub use self::destination::{
    CandidatePoint, Destination, ImageRef, ImageUrl, RouteRecord, RouteRecordValidationError,
};
pub use self::geocode::{GeocodeError, GeocodeGeometry, GeocodeResult};
pub use self::geojson::{Feature, FeatureCollection, Geometry};
pub use self::pulse::{PULSE_SIZE_PX, PulseFrame, PulsingDot, pulse_frame, pulse_period};
pub use self::render::{RenderStyle, RenderSynchronizer, here_features, route_features};
pub use self::selection::{
    Generation, InstallOutcome, SelectionChange, SelectionError, SelectionSet, SelectionStore,
    shortest_index,
};
pub use self::session::{
    Dispatch, MapEvent, MapSession, MapSessionConfig, MapSessionPorts, SearchOutcome,
    SessionError, SessionSnapshot,
};
pub use self::transition::{
    Admission, CameraTransitionGuard, ParseReentryPolicyError, ReentryPolicy, Settle,
    TransitionState,
};
