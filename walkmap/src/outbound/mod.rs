//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **locations**: reqwest adapter for nearby points and their images
//! - **routing**: reqwest adapter for walking directions
//! - **headless**: tracing-only map engine for the command-line driver
//!
//! Adapters are thin translators that convert between domain types and
//! transport representations. They contain no business logic.

pub mod headless;
mod http_status;
pub mod locations;
pub mod routing;
