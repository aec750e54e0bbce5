//! Transport-level error types.

use thiserror::Error;

/// Failure of a single call to the backend service.
///
/// This is the raw outcome of a round trip. The session store and the
/// directory/timeline classify it into a [`crate::ClientError`] before it
/// reaches the renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the credentials (HTTP 401).
    #[error("unauthorized")]
    Unauthorized {
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The backend returned a non-success status other than 401.
    #[error("API error ({status})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// A success response whose body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Invalid base URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Message carried by the response body, if the backend sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } | Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether the backend answered at all.
    #[must_use]
    pub fn has_response(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Api { .. } | Self::Decode(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type alias for backend calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
