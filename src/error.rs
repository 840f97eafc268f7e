//! Error types for the image chat client and gateway

use thiserror::Error;

/// Result type alias for image chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the image generation API
#[derive(Debug, Error)]
pub enum Error {
    /// Upstream API answered with a non-success status
    #[error("API request failed: {status}")]
    Api {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The response carried no inline image part
    #[error("no image found in response")]
    NoImage,

    /// More reference images than the API accepts
    #[error("too many reference images: {count} (max {max})")]
    TooManyImages { count: usize, max: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid base64 image payload
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// HTTP status of a failed upstream call, if this is one
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
