//! Fetch pipeline for one search cycle.
//!
//! Candidates are resolved concurrently and awaited together; the caller
//! installs the surviving destinations in a single step. Every failure is
//! contained to the candidate it belongs to.

use futures_util::future::{join, join_all};
use tracing::warn;

use crate::domain::ports::{ImageSource, PointSource, RouteFetcher};
use crate::domain::{CandidatePoint, Coordinate, Destination};

/// Resolve every candidate around `center` into a destination.
///
/// Upstream order is preserved. A failing point lookup yields no
/// destinations; a failing route or image lookup drops that candidate only.
pub(super) async fn resolve_destinations(
    points: &dyn PointSource,
    images: &dyn ImageSource,
    routes: &dyn RouteFetcher,
    center: Coordinate,
) -> Vec<Destination> {
    let candidates = match points.fetch_points(center).await {
        Ok(candidates) => candidates,
        Err(error) => {
            warn!(
                error = %error,
                kind = error.kind(),
                center = %center,
                "point lookup failed; treating cycle as empty"
            );
            return Vec::new();
        }
    };

    join_all(
        candidates
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| {
                resolve_candidate(images, routes, center, position, candidate)
            }),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

async fn resolve_candidate(
    images: &dyn ImageSource,
    routes: &dyn RouteFetcher,
    center: Coordinate,
    position: usize,
    candidate: CandidatePoint,
) -> Option<Destination> {
    let wanted = candidate.image_ref.clone();
    let image_lookup = async move {
        match wanted {
            Some(image_ref) => images.fetch_image(&image_ref).await.map(Some),
            None => Ok(None),
        }
    };
    let (route_result, image_result) =
        join(routes.fetch_route(center, candidate.coordinate), image_lookup).await;

    let route = match route_result {
        Ok(route) => route,
        Err(error) => {
            warn!(
                error = %error,
                kind = error.kind(),
                retryable = error.is_retryable(),
                candidate = position,
                destination = %candidate.coordinate,
                "route lookup failed; excluding candidate"
            );
            return None;
        }
    };
    let image = match image_result {
        Ok(image) => image,
        Err(error) => {
            warn!(
                error = %error,
                kind = error.kind(),
                candidate = position,
                "image lookup failed; excluding candidate"
            );
            return None;
        }
    };

    Some(Destination {
        candidate,
        route,
        image,
    })
}

#[cfg(test)]
mod tests {
    //! Fan-out coverage driven by mocked and fixture ports.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::RouteRecord;
    use crate::domain::ports::{
        FixtureImageSource, FixturePointSource, FixtureRouteFetcher, MockImageSource,
        MockPointSource, MockRouteFetcher, PointSourceError, RouteFetchError,
    };
    use crate::test_support::sources::candidate;

    #[fixture]
    fn center() -> Coordinate {
        Coordinate::new(-122.4165, 37.7554).expect("valid centre")
    }

    fn around(center: Coordinate) -> Vec<CandidatePoint> {
        [0.001, 0.002, 0.003]
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let point = Coordinate::new(center.longitude() + step, center.latitude())
                    .expect("valid coordinate");
                candidate(point, &format!("img-{index}"))
            })
            .collect()
    }

    #[rstest]
    #[tokio::test]
    async fn point_failure_skips_every_other_lookup(center: Coordinate) {
        let mut points = MockPointSource::new();
        points
            .expect_fetch_points()
            .times(1)
            .returning(|_| Err(PointSourceError::transport("connection reset")));
        let mut images = MockImageSource::new();
        images.expect_fetch_image().never();
        let mut routes = MockRouteFetcher::new();
        routes.expect_fetch_route().never();

        let resolved = resolve_destinations(&points, &images, &routes, center).await;

        assert!(resolved.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn empty_upstream_issues_no_route_requests(center: Coordinate) {
        let mut routes = MockRouteFetcher::new();
        routes.expect_fetch_route().never();

        let resolved =
            resolve_destinations(&FixturePointSource, &FixtureImageSource, &routes, center).await;

        assert!(resolved.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn failing_route_is_dropped_and_order_kept(center: Coordinate) {
        let candidates = around(center);
        let failing = candidates[1].coordinate;
        let mut points = MockPointSource::new();
        let upstream = candidates.clone();
        points
            .expect_fetch_points()
            .times(1)
            .returning(move |_| Ok(upstream.clone()));
        let mut routes = MockRouteFetcher::new();
        routes
            .expect_fetch_route()
            .times(3)
            .returning(move |start, end| {
                if end == failing {
                    return Err(RouteFetchError::no_route());
                }
                RouteRecord::new(end, vec![start, end], 250.0)
                    .map_err(|error| RouteFetchError::decode(error.to_string()))
            });

        let resolved = resolve_destinations(&points, &FixtureImageSource, &routes, center).await;

        let kept: Vec<Coordinate> = resolved
            .iter()
            .map(|destination| destination.candidate.coordinate)
            .collect();
        assert_eq!(kept, vec![candidates[0].coordinate, candidates[2].coordinate]);
        assert!(resolved.iter().all(|destination| destination.image.is_some()));
    }

    #[rstest]
    #[tokio::test]
    async fn candidates_without_images_skip_the_image_lookup(center: Coordinate) {
        let mut bare = around(center);
        for point in &mut bare {
            point.image_ref = None;
        }
        let mut points = MockPointSource::new();
        points
            .expect_fetch_points()
            .times(1)
            .returning(move |_| Ok(bare.clone()));
        let mut images = MockImageSource::new();
        images.expect_fetch_image().never();

        let resolved = resolve_destinations(&points, &images, &FixtureRouteFetcher, center).await;

        assert_eq!(resolved.len(), 3);
        assert!(resolved.iter().all(|destination| destination.image.is_none()));
    }
}
