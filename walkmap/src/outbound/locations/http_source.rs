//! Reqwest-backed location and image adapter.
//!
//! This adapter owns transport details only: URL building, timeout and HTTP
//! error mapping, JSON decoding, the distance filter and data-URL encoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::warn;

use super::dto::NearestLocationsDto;
use crate::domain::ports::{ImageSource, ImageSourceError, PointSource, PointSourceError};
use crate::domain::{CandidatePoint, Coordinate, ImageRef, ImageUrl};
use crate::outbound::http_status::{FailureClass, classify_status, classify_transport, join_path};

/// Default radius around a search centre.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 5.0;

/// Location backend adapter serving both nearby points and their images.
pub struct LocationsHttpSource {
    client: Client,
    base: Url,
    max_distance_m: f64,
}

impl LocationsHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration, max_distance_km: f64) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base, max_distance_km))
    }

    /// Build an adapter around an existing client.
    #[expect(
        clippy::float_arithmetic,
        reason = "the configured radius is in kilometres, candidates in metres"
    )]
    #[must_use]
    pub fn with_client(client: Client, base: Url, max_distance_km: f64) -> Self {
        Self {
            client,
            base,
            max_distance_m: max_distance_km.max(0.0) * 1_000.0,
        }
    }

    fn locations_url(&self, center: Coordinate) -> Result<Url, PointSourceError> {
        let mut url = join_path(&self.base, "loc/").map_err(|error| {
            PointSourceError::invalid_request(format!("invalid locations URL: {error}"))
        })?;
        url.query_pairs_mut()
            .append_pair("latitude", &center.latitude().to_string())
            .append_pair("longitude", &center.longitude().to_string());
        Ok(url)
    }

    fn image_url(&self, image: &ImageRef) -> Result<Url, ImageSourceError> {
        let id = validate_image_id(image.as_str())?;
        join_path(&self.base, &format!("img/{id}.jpg"))
            .map_err(|error| ImageSourceError::invalid_request(format!("invalid image URL: {error}")))
    }
}

#[async_trait]
impl PointSource for LocationsHttpSource {
    async fn fetch_points(
        &self,
        center: Coordinate,
    ) -> Result<Vec<CandidatePoint>, PointSourceError> {
        let url = self.locations_url(center)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| point_error(classify_transport(&error)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| point_error(classify_transport(&error)))?;
        if !status.is_success() {
            return Err(point_error(classify_status(status, body.as_ref())));
        }

        parse_candidates(body.as_ref(), center, self.max_distance_m)
    }
}

#[async_trait]
impl ImageSource for LocationsHttpSource {
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageUrl, ImageSourceError> {
        let url = self.image_url(image)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| image_error(classify_transport(&error), image))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| image_error(classify_transport(&error), image))?;
        if !status.is_success() {
            return Err(image_error(classify_status(status, body.as_ref()), image));
        }
        Ok(ImageUrl::from_jpeg_bytes(body.as_ref()))
    }
}

fn parse_candidates(
    body: &[u8],
    center: Coordinate,
    max_distance_m: f64,
) -> Result<Vec<CandidatePoint>, PointSourceError> {
    let decoded: NearestLocationsDto = serde_json::from_slice(body).map_err(|error| {
        PointSourceError::decode(format!("invalid locations JSON payload: {error}"))
    })?;

    Ok(decoded
        .nearest_locations
        .into_iter()
        .filter_map(|location| match location.into_candidate(center) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                warn!(reason = %reason, "skipping unusable location");
                None
            }
        })
        .filter(|candidate| candidate.distance_m <= max_distance_m)
        .collect())
}

fn validate_image_id(id: &str) -> Result<&str, ImageSourceError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ImageSourceError::invalid_request("image id must not be blank"));
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ImageSourceError::invalid_request(format!(
            "image id `{trimmed}` contains unsupported characters"
        )));
    }
    Ok(trimmed)
}

fn point_error(class: FailureClass) -> PointSourceError {
    match class {
        FailureClass::Timeout(message) => PointSourceError::timeout(message),
        FailureClass::InvalidRequest(message) | FailureClass::NotFound(message) => {
            PointSourceError::invalid_request(message)
        }
        FailureClass::Transport(message) | FailureClass::RateLimited(message) => {
            PointSourceError::transport(message)
        }
    }
}

fn image_error(class: FailureClass, image: &ImageRef) -> ImageSourceError {
    match class {
        FailureClass::Timeout(message) => ImageSourceError::timeout(message),
        FailureClass::NotFound(_) => ImageSourceError::not_found(image.as_str()),
        FailureClass::InvalidRequest(message) => ImageSourceError::invalid_request(message),
        FailureClass::Transport(message) | FailureClass::RateLimited(message) => {
            ImageSourceError::transport(message)
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network location mapping helpers.

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn center() -> Coordinate {
        Coordinate::new(-122.4165, 37.7554).expect("valid centre")
    }

    fn source(base: &str) -> LocationsHttpSource {
        LocationsHttpSource::with_client(
            Client::new(),
            Url::parse(base).expect("valid base"),
            DEFAULT_MAX_DISTANCE_KM,
        )
    }

    #[rstest]
    fn builds_locations_query(center: Coordinate) {
        let url = source("https://walks.example/api")
            .locations_url(center)
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://walks.example/api/loc/?latitude=37.7554&longitude=-122.4165"
        );
    }

    #[rstest]
    #[case::plain("42", "https://walks.example/img/42.jpg")]
    #[case::padded(" 7a_b-c ", "https://walks.example/img/7a_b-c.jpg")]
    fn builds_image_urls(#[case] id: &str, #[case] expected: &str) {
        let url = source("https://walks.example/")
            .image_url(&ImageRef::new(id))
            .expect("url");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case::blank("  ")]
    #[case::traversal("../secret")]
    #[case::query("1?x=2")]
    fn rejects_unsafe_image_ids(#[case] id: &str) {
        let error = source("https://walks.example/")
            .image_url(&ImageRef::new(id))
            .expect_err("id must be rejected");
        assert!(matches!(error, ImageSourceError::InvalidRequest { .. }));
    }

    #[rstest]
    fn parses_and_filters_by_distance(center: Coordinate) {
        let body = r#"{
            "nearest_locations": [
                { "id": 1, "latitude": 37.7596, "longitude": -122.4269, "distance": 1.02 },
                { "id": "2", "latitude": 37.8199, "longitude": -122.4783, "distance": 8.9 },
                { "id": 3, "latitude": 37.7520, "longitude": -122.4180 },
                { "latitude": 95.0, "longitude": -122.4180, "distance": 0.1 }
            ]
        }"#;

        let candidates = parse_candidates(body.as_bytes(), center, 5_000.0).expect("decodes");

        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].image_ref.as_ref().map(ImageRef::as_str),
            Some("1")
        );
        assert!((candidates[0].distance_m - 1_020.0).abs() < 1e-6);
        assert_eq!(
            candidates[1].image_ref.as_ref().map(ImageRef::as_str),
            Some("3")
        );
        let expected = center.distance_m(candidates[1].coordinate);
        assert!((candidates[1].distance_m - expected).abs() < 1e-6);
    }

    #[rstest]
    fn missing_list_decodes_as_empty(center: Coordinate) {
        let candidates = parse_candidates(b"{}", center, 5_000.0).expect("decodes");
        assert!(candidates.is_empty());
    }

    #[rstest]
    fn malformed_json_is_a_decode_error(center: Coordinate) {
        let error = parse_candidates(b"<html>", center, 5_000.0).expect_err("must fail");
        assert!(matches!(error, PointSourceError::Decode { .. }));
    }

    #[test]
    fn maps_missing_images_to_not_found() {
        let image = ImageRef::new("42");
        let error = image_error(FailureClass::NotFound("status 404".to_owned()), &image);
        assert_eq!(error, ImageSourceError::not_found("42"));
    }
}
