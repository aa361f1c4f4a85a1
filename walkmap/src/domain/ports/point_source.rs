//! Driven port for fetching candidate points near a search centre.
//!
//! The domain owns the request shape and the candidate contract so the
//! session orchestration can stay adapter-agnostic.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{CandidatePoint, Coordinate};

define_port_error! {
    /// Errors surfaced while fetching nearby points.
    pub enum PointSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "point source transport failed: {message}",
        /// The backend did not answer within the request timeout.
        Timeout { message: String } =>
            "point source timeout: {message}",
        /// The backend response could not be decoded.
        Decode { message: String } =>
            "point source response decode failed: {message}",
        /// The backend rejected the request.
        InvalidRequest { message: String } =>
            "point source request invalid: {message}",
    }
}

/// Port for listing candidate points around a centre.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointSource: Send + Sync {
    /// Fetch candidates within the adapter's maximum distance of `center`.
    ///
    /// Candidate order is whatever the upstream returns; callers must keep
    /// it when aligning routes and markers by index.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use walkmap::domain::Coordinate;
    /// use walkmap::domain::ports::{FixturePointSource, PointSource};
    ///
    /// let source = FixturePointSource;
    /// let center = Coordinate::new(-122.4165, 37.7554)?;
    /// let points = source.fetch_points(center).await?;
    /// assert!(points.is_empty());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    async fn fetch_points(&self, center: Coordinate)
    -> Result<Vec<CandidatePoint>, PointSourceError>;
}

/// Fixture implementation returning no candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixturePointSource;

#[async_trait]
impl PointSource for FixturePointSource {
    async fn fetch_points(
        &self,
        _center: Coordinate,
    ) -> Result<Vec<CandidatePoint>, PointSourceError> {
        Ok(Vec::new())
    }
}
