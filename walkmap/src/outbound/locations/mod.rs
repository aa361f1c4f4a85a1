//! Location backend outbound adapter.
//!
//! One HTTP implementation serves both the `PointSource` and `ImageSource`
//! ports, since both live on the same backend.

mod dto;
mod http_source;

pub use http_source::{DEFAULT_MAX_DISTANCE_KM, LocationsHttpSource};
