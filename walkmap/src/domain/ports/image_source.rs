//! Driven port for resolving candidate images into displayable references.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{ImageRef, ImageUrl};

define_port_error! {
    /// Errors surfaced while fetching a candidate image.
    pub enum ImageSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "image transport failed: {message}",
        /// The backend did not answer within the request timeout.
        Timeout { message: String } =>
            "image fetch timeout: {message}",
        /// The identifier cannot be turned into a request.
        InvalidRequest { message: String } =>
            "image request invalid: {message}",
        /// The backend has no image for the identifier.
        NotFound { id: String } =>
            "image {id} not found",
    }
}

/// Port for turning an [`ImageRef`] into an [`ImageUrl`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch one image.
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageUrl, ImageSourceError>;
}

/// Fixture implementation that embeds the identifier as a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureImageSource;

#[async_trait]
impl ImageSource for FixtureImageSource {
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageUrl, ImageSourceError> {
        Ok(ImageUrl::from_jpeg_bytes(image.as_str().as_bytes()))
    }
}
