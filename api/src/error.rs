//! Error types for the backend API client

use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The session is missing or expired (HTTP 401)
    ///
    /// By the time a caller sees this, the client has already published
    /// [`SessionEvent::Unauthorized`](crate::SessionEvent::Unauthorized).
    #[error("Unauthorized - session expired or missing")]
    Unauthorized,

    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body could not be decoded
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Backend returned a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// Backend answered `success: false` in an envelope
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A local file could not be turned into an upload
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

impl ApiError {
    /// Text suitable for an alert or inline banner
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::Timeout => "The server took too long to respond. Please try again.".to_string(),
            Self::RequestFailed(_) => "Could not reach the server. Please try again.".to_string(),
            Self::ResponseParseFailed(_) => "The server sent an unexpected response.".to_string(),
            Self::Api { message, .. } | Self::Rejected(message) | Self::InvalidUpload(message) => {
                message.clone()
            }
        }
    }

    /// Convert a transport error, distinguishing timeouts
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::ResponseParseFailed(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
