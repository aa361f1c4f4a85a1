//! Map interaction core for nearby walking routes.
//!
//! A search centre fans out into nearby candidates, each resolved into a
//! walking route and an image, and the shortest route is selected. The
//! [`domain::MapSession`] keeps the map engine in sync with that selection
//! while a camera guard locks input during fly-to animations.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{SettingsError, WalkMapSettings};
