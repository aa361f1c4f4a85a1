//! Candidate points, walking routes, and their per-cycle pairing.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::Coordinate;

/// Opaque image identifier supplied by the location backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a backend image identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Displayable image reference, usually a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Wrap an already displayable URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Embed JPEG bytes as a base64 `data:` URL.
    ///
    /// ```
    /// use walkmap::domain::ImageUrl;
    ///
    /// let url = ImageUrl::from_jpeg_bytes(b"jpg");
    /// assert_eq!(url.as_str(), "data:image/jpeg;base64,anBn");
    /// ```
    #[must_use]
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        Self(format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)))
    }

    /// Borrow the URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A nearby point of interest returned for one search cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePoint {
    /// Location of the point.
    pub coordinate: Coordinate,
    /// Image to fetch for the detail popup, when the backend supplies one.
    pub image_ref: Option<ImageRef>,
    /// Distance from the cycle's centre in metres.
    pub distance_m: f64,
}

/// Validation errors raised by [`RouteRecord::new`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteRecordValidationError {
    /// Length was negative, NaN or infinite.
    #[error("route length must be finite and non-negative (got {value})")]
    InvalidLength {
        /// Rejected length in metres.
        value: f64,
    },
    /// Geometry had no positions.
    #[error("route geometry must contain at least one position")]
    EmptyGeometry,
}

/// A resolved walking route to one destination.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    destination: Coordinate,
    geometry: Vec<Coordinate>,
    length_m: f64,
}

impl RouteRecord {
    /// Build a validated route record.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite lengths and empty geometries.
    pub fn new(
        destination: Coordinate,
        geometry: Vec<Coordinate>,
        length_m: f64,
    ) -> Result<Self, RouteRecordValidationError> {
        if !length_m.is_finite() || length_m < 0.0 {
            return Err(RouteRecordValidationError::InvalidLength { value: length_m });
        }
        if geometry.is_empty() {
            return Err(RouteRecordValidationError::EmptyGeometry);
        }
        Ok(Self {
            destination,
            geometry,
            length_m,
        })
    }

    /// End point of the route.
    #[must_use]
    pub const fn destination(&self) -> Coordinate {
        self.destination
    }

    /// Route polyline from start to destination.
    #[must_use]
    pub fn geometry(&self) -> &[Coordinate] {
        &self.geometry
    }

    /// Route length in metres.
    #[must_use]
    pub const fn length_m(&self) -> f64 {
        self.length_m
    }
}

/// One fully resolved candidate: the point, its route, and its image.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// The point as returned by the location backend.
    pub candidate: CandidatePoint,
    /// Walking route from the cycle centre.
    pub route: RouteRecord,
    /// Popup image; `None` when the candidate carried no image reference.
    pub image: Option<ImageUrl>,
}
