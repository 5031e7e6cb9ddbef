//! Error types for platform and object store calls.

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Errors that can occur while talking to the hosting platform or object store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The named resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The request could not be sent or no response was received.
    #[error("Request Error: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl PlatformError {
    /// Returns true when the error means the resource is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
