//! Driven port for walking routes between two coordinates.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Coordinate, RouteRecord};

define_port_error! {
    /// Errors surfaced while fetching a walking route.
    pub enum RouteFetchError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "routing transport failed: {message}",
        /// The routing backend did not answer within the request timeout.
        Timeout { message: String } =>
            "routing timeout: {message}",
        /// The routing backend rate-limited the request.
        RateLimited { message: String } =>
            "routing rate limited request: {message}",
        /// The routing response could not be decoded.
        Decode { message: String } =>
            "routing response decode failed: {message}",
        /// The backend rejected the request.
        InvalidRequest { message: String } =>
            "routing request invalid: {message}",
        /// The backend answered without any route.
        NoRoute =>
            "routing backend returned no route",
    }
}

impl RouteFetchError {
    /// Return whether retrying this error is expected to help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

/// Port for fetching one walking route.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteFetcher: Send + Sync {
    /// Fetch the walking route from `start` to `end`.
    ///
    /// The returned record's destination is `end` and its length is in
    /// metres.
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteRecord, RouteFetchError>;
}

/// Fixture implementation drawing a straight line between the endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRouteFetcher;

#[async_trait]
impl RouteFetcher for FixtureRouteFetcher {
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteRecord, RouteFetchError> {
        RouteRecord::new(end, vec![start, end], start.distance_m(end))
            .map_err(|error| RouteFetchError::decode(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transport(RouteFetchError::transport("reset"), true)]
    #[case::timeout(RouteFetchError::timeout("slow"), true)]
    #[case::rate_limited(RouteFetchError::rate_limited("429"), true)]
    #[case::decode(RouteFetchError::decode("bad json"), false)]
    #[case::no_route(RouteFetchError::no_route(), false)]
    fn classifies_retryable_errors(#[case] error: RouteFetchError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[tokio::test]
    async fn fixture_draws_straight_line() {
        let start = Coordinate::new(-122.4165, 37.7554).expect("valid coordinate");
        let end = Coordinate::new(-122.4194, 37.7749).expect("valid coordinate");

        let route = FixtureRouteFetcher
            .fetch_route(start, end)
            .await
            .expect("fixture route");
        assert_eq!(route.destination(), end);
        assert_eq!(route.geometry(), &[start, end]);
        assert!(route.length_m() > 2_000.0);
    }
}
