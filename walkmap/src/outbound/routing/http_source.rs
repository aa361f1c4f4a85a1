//! Reqwest-backed walking directions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::dto::DirectionsDto;
use crate::domain::ports::{RouteFetchError, RouteFetcher};
use crate::domain::{Coordinate, RouteRecord};
use crate::outbound::http_status::{FailureClass, classify_status, classify_transport, join_path};

/// Directions adapter that always requests the walking profile.
pub struct DirectionsHttpSource {
    client: Client,
    base: Url,
    access_token: Option<String>,
}

impl DirectionsHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        timeout: Duration,
        access_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base, access_token))
    }

    /// Build an adapter around an existing client.
    #[must_use]
    pub fn with_client(client: Client, base: Url, access_token: Option<String>) -> Self {
        Self {
            client,
            base,
            access_token: access_token.filter(|token| !token.trim().is_empty()),
        }
    }

    fn directions_url(&self, start: Coordinate, end: Coordinate) -> Result<Url, RouteFetchError> {
        let path = format!("directions/v5/mapbox/walking/{start};{end}");
        let mut url = join_path(&self.base, &path).map_err(|error| {
            RouteFetchError::invalid_request(format!("invalid directions URL: {error}"))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("geometries", "geojson")
                .append_pair("overview", "full");
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl RouteFetcher for DirectionsHttpSource {
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteRecord, RouteFetchError> {
        let url = self.directions_url(start, end)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| route_error(classify_transport(&error)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| route_error(classify_transport(&error)))?;
        if !status.is_success() {
            return Err(route_error(classify_status(status, body.as_ref())));
        }

        parse_route(body.as_ref(), end)
    }
}

fn parse_route(body: &[u8], end: Coordinate) -> Result<RouteRecord, RouteFetchError> {
    let decoded: DirectionsDto = serde_json::from_slice(body).map_err(|error| {
        RouteFetchError::decode(format!("invalid directions JSON payload: {error}"))
    })?;
    let route = decoded
        .routes
        .into_iter()
        .next()
        .ok_or_else(RouteFetchError::no_route)?;
    route.into_record(end).map_err(RouteFetchError::decode)
}

fn route_error(class: FailureClass) -> RouteFetchError {
    match class {
        FailureClass::Transport(message) => RouteFetchError::transport(message),
        FailureClass::Timeout(message) => RouteFetchError::timeout(message),
        FailureClass::RateLimited(message) => RouteFetchError::rate_limited(message),
        FailureClass::NotFound(message) | FailureClass::InvalidRequest(message) => {
            RouteFetchError::invalid_request(message)
        }
    }
}
