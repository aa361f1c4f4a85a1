//! Session and adapter settings loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::ports::ZoomRange;
use crate::domain::{
    Coordinate, MapSessionConfig, ParseReentryPolicyError, ReentryPolicy, RenderStyle,
};
use crate::outbound::locations::DEFAULT_MAX_DISTANCE_KM;

const DEFAULT_LOCATIONS_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_ROUTING_BASE_URL: &str = "https://api.mapbox.com/";
const DEFAULT_FLY_DURATION_MS: u64 = 3_000;
const DEFAULT_FLY_ZOOM: f64 = 14.0;
const DEFAULT_MIN_ZOOM: f64 = 0.0;
const DEFAULT_MAX_ZOOM: f64 = 15.0;
const DEFAULT_FIT_PADDING_PX: u32 = 80;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while turning raw settings into typed configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A base URL failed to parse.
    #[error("{field} is not a valid URL: {source}")]
    InvalidUrl {
        /// Settings field holding the URL.
        field: &'static str,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The re-entry policy name is unknown.
    #[error(transparent)]
    Reentry(#[from] ParseReentryPolicyError),
    /// `min_zoom` exceeds `max_zoom`, or either is not finite.
    #[error("zoom range [{min}, {max}] is empty")]
    InvalidZoomRange {
        /// Configured lower bound.
        min: f64,
        /// Configured upper bound.
        max: f64,
    },
    /// The search radius is negative or not finite.
    #[error("max_distance_km must be finite and non-negative (got {value})")]
    InvalidMaxDistance {
        /// Configured radius.
        value: f64,
    },
}

/// Configuration values for backends, camera behaviour and re-entry.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WALKMAP")]
pub struct WalkMapSettings {
    /// Base URL of the location and image backend.
    pub locations_base_url: Option<String>,
    /// Base URL of the directions backend.
    pub routing_base_url: Option<String>,
    /// Access token appended to directions requests.
    pub routing_access_token: Option<String>,
    /// Search radius in kilometres.
    pub max_distance_km: Option<f64>,
    /// Fly-to animation length in milliseconds.
    pub fly_duration_ms: Option<u64>,
    /// Zoom reached at the end of a fly-to.
    pub fly_zoom: Option<f64>,
    /// Lowest zoom allowed once the camera settles.
    pub min_zoom: Option<f64>,
    /// Highest zoom allowed once the camera settles.
    pub max_zoom: Option<f64>,
    /// Camera margin when fitting a cycle's candidates.
    pub fit_padding_px: Option<u32>,
    /// Per-request HTTP timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// `drop` or `replay-latest`.
    pub reentry: Option<String>,
}

impl WalkMapSettings {
    /// Location backend base URL, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for unparsable values.
    pub fn locations_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "locations_base_url",
            self.locations_base_url
                .as_deref()
                .unwrap_or(DEFAULT_LOCATIONS_BASE_URL),
        )
    }

    /// Directions backend base URL, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for unparsable values.
    pub fn routing_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "routing_base_url",
            self.routing_base_url
                .as_deref()
                .unwrap_or(DEFAULT_ROUTING_BASE_URL),
        )
    }

    /// Directions access token, if configured.
    #[must_use]
    pub fn routing_access_token(&self) -> Option<String> {
        self.routing_access_token.clone()
    }

    /// Search radius in kilometres.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite radii.
    pub fn max_distance_km(&self) -> Result<f64, SettingsError> {
        let value = self.max_distance_km.unwrap_or(DEFAULT_MAX_DISTANCE_KM);
        if !value.is_finite() || value < 0.0 {
            return Err(SettingsError::InvalidMaxDistance { value });
        }
        Ok(value)
    }

    /// Fly-to animation length.
    #[must_use]
    pub fn fly_duration(&self) -> Duration {
        Duration::from_millis(self.fly_duration_ms.unwrap_or(DEFAULT_FLY_DURATION_MS))
    }

    /// Per-request HTTP timeout, never zero.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS)
                .max(1),
        )
    }

    /// Zoom bounds restored after each fly-to.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidZoomRange`] when `min_zoom > max_zoom`.
    pub fn zoom_range(&self) -> Result<ZoomRange, SettingsError> {
        let min = self.min_zoom.unwrap_or(DEFAULT_MIN_ZOOM);
        let max = self.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM);
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(SettingsError::InvalidZoomRange { min, max });
        }
        Ok(ZoomRange { min, max })
    }

    /// Configured re-entry policy; `drop` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Reentry`] for unknown policy names.
    pub fn reentry(&self) -> Result<ReentryPolicy, SettingsError> {
        self.reentry
            .as_deref()
            .map_or(Ok(ReentryPolicy::default()), str::parse)
            .map_err(SettingsError::from)
    }

    /// Build the session configuration around `initial_center`.
    ///
    /// # Errors
    ///
    /// Propagates any invalid camera or re-entry setting.
    pub fn session_config(
        &self,
        initial_center: Coordinate,
    ) -> Result<MapSessionConfig, SettingsError> {
        let zoom_range = self.zoom_range()?;
        let fly_zoom = self
            .fly_zoom
            .unwrap_or(DEFAULT_FLY_ZOOM)
            .clamp(zoom_range.min, zoom_range.max);
        Ok(MapSessionConfig {
            fly_duration: self.fly_duration(),
            fly_zoom,
            zoom_range,
            reentry: self.reentry()?,
            style: RenderStyle {
                fit_padding_px: self.fit_padding_px.unwrap_or(DEFAULT_FIT_PADDING_PX),
                ..RenderStyle::default()
            },
            ..MapSessionConfig::centered_on(initial_center)
        })
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw.trim()).map_err(|source| SettingsError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
    //! Unit tests for walkmap configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::{fixture, rstest};

    const VARS: [&str; 11] = [
        "WALKMAP_LOCATIONS_BASE_URL",
        "WALKMAP_ROUTING_BASE_URL",
        "WALKMAP_ROUTING_ACCESS_TOKEN",
        "WALKMAP_MAX_DISTANCE_KM",
        "WALKMAP_FLY_DURATION_MS",
        "WALKMAP_FLY_ZOOM",
        "WALKMAP_MIN_ZOOM",
        "WALKMAP_MAX_ZOOM",
        "WALKMAP_FIT_PADDING_PX",
        "WALKMAP_REQUEST_TIMEOUT_MS",
        "WALKMAP_REENTRY",
    ];

    #[fixture]
    fn center() -> Coordinate {
        Coordinate::new(-122.4194, 37.7749).expect("valid centre")
    }

    fn load_from_empty_args() -> WalkMapSettings {
        WalkMapSettings::load_from_iter([OsString::from("walkmap")]).expect("config should load")
    }

    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing(center: Coordinate) {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.locations_base_url().expect("url").as_str(),
            DEFAULT_LOCATIONS_BASE_URL
        );
        assert_eq!(
            settings.max_distance_km().expect("distance"),
            DEFAULT_MAX_DISTANCE_KM
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));

        let config = settings.session_config(center).expect("session config");
        assert_eq!(config.fly_duration, Duration::from_millis(3_000));
        assert_eq!(config.reentry, ReentryPolicy::Drop);
        assert_eq!(config.zoom_range, ZoomRange { min: 0.0, max: 15.0 });
        assert_eq!(config.initial_center, center);
    }

    #[rstest]
    fn environment_overrides_are_respected(center: Coordinate) {
        let _guard = lock_env(env_with(&[
            ("WALKMAP_LOCATIONS_BASE_URL", "https://walks.example/api/"),
            ("WALKMAP_ROUTING_ACCESS_TOKEN", "pk.test"),
            ("WALKMAP_MAX_DISTANCE_KM", "2.5"),
            ("WALKMAP_FLY_DURATION_MS", "1500"),
            ("WALKMAP_MAX_ZOOM", "18"),
            ("WALKMAP_FLY_ZOOM", "16"),
            ("WALKMAP_FIT_PADDING_PX", "40"),
            ("WALKMAP_REENTRY", "replay-latest"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.locations_base_url().expect("url").as_str(),
            "https://walks.example/api/"
        );
        assert_eq!(settings.routing_access_token().as_deref(), Some("pk.test"));
        assert_eq!(settings.max_distance_km().expect("distance"), 2.5);

        let config = settings.session_config(center).expect("session config");
        assert_eq!(config.fly_duration, Duration::from_millis(1_500));
        assert_eq!(config.fly_zoom, 16.0);
        assert_eq!(config.style.fit_padding_px, 40);
        assert_eq!(config.reentry, ReentryPolicy::ReplayLatest);
    }

    #[rstest]
    #[case::bad_policy(&[("WALKMAP_REENTRY", "queue-all")])]
    #[case::inverted_zoom(&[("WALKMAP_MIN_ZOOM", "16"), ("WALKMAP_MAX_ZOOM", "4")])]
    fn invalid_values_fail_session_config(center: Coordinate, #[case] overrides: &[(&str, &str)]) {
        let _guard = lock_env(env_with(overrides));

        let settings = load_from_empty_args();
        assert!(settings.session_config(center).is_err());
    }

    #[rstest]
    fn unparsable_urls_name_the_field() {
        let _guard = lock_env(env_with(&[("WALKMAP_ROUTING_BASE_URL", "not a url")]));

        let error = load_from_empty_args()
            .routing_base_url()
            .expect_err("url must fail");
        assert!(error.to_string().starts_with("routing_base_url"));
    }
}
