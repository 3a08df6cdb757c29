//! # API Error Types
//!
//! Failures of the remote catalog, and their mapping onto the closed
//! [`ErrorKind`] set the slices store.

use thiserror::Error;
use tote_core::{ErrorKind, RequestError};

/// Result type alias for catalog calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Remote catalog errors.
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Base URL can't be used for requests.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request did not complete in time.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// DNS, connection refused, TLS and other transport failures.
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// The resource does not exist (404, or an empty 200 body).
    #[error("{0}")]
    NotFound(String),

    /// Credentials refused (401/403). Carries the server's text.
    #[error("{0}")]
    Unauthorized(String),

    /// Any other non-2xx status.
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The body could not be understood.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The [`ErrorKind`] a slice records for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::InvalidUrl(_) | ApiError::ClientSetup(_) | ApiError::Unreachable(_) => {
                ErrorKind::Unreachable
            }
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::Status { status, .. } => ErrorKind::HttpStatus(*status),
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }
}

impl From<ApiError> for RequestError {
    fn from(err: ApiError) -> Self {
        let kind = err.kind();
        RequestError::new(kind, err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<tote_core::CoreError> for ApiError {
    fn from(err: tote_core::CoreError) -> Self {
        ApiError::Decode(err.to_string())
    }
}
