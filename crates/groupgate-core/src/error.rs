//! Error types for directory lookups and group resolution.
//!
//! This module provides the error hierarchy shared by both directory transports, a stable
//! machine-readable code per variant, and [`StatusError`], which pairs an error with the
//! status code reported by the transport layer.

use serde::Serialize;
use thiserror::Error;

/// Status reported when a transport fails before producing a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Status reported when no HTTP exchange was involved.
pub const NO_TRANSPORT_STATUS: u16 = 0;

/// Main error type for groupgate operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Directory API answered with a non-success status
    #[error("Directory API returned status {status}: {message}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// Directory is unreachable
    #[error("Directory unavailable: {0}")]
    ServiceUnavailable(String),

    /// Directory protocol failure (connect, bind, search)
    #[error("External service error: {service}: {message}")]
    ExternalServiceError {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },

    /// Response body did not match the expected envelope
    #[error("Failed to decode directory response: {0}")]
    DecodeError(String),

    /// Search returned other than exactly one record
    #[error("Expected exactly one directory record, found {0}")]
    UnexpectedRecordCount(usize),

    /// A `memberOf` value was not an RDN-encoded DN
    #[error("Malformed group membership value: {0}")]
    MalformedGroup(String),

    /// None of the subject's groups are accepted
    #[error("No matching directory groups for subject `{0}`")]
    NoMatchingGroup(String),
}

/// Specialized result type for groupgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for operations that also report a transport status code.
pub type StatusResult<T> = std::result::Result<T, StatusError>;

/// An [`Error`] together with the status code observed when it happened.
///
/// The status is the HTTP status when one was received, [`TRANSPORT_FAILURE_STATUS`] for
/// transport failures without a response, and [`NO_TRANSPORT_STATUS`] otherwise.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct StatusError {
    /// Status code reported alongside the error
    pub status: u16,
    /// Underlying error
    #[source]
    pub error: Error,
}

impl StatusError {
    /// Pair an error with an explicit status code.
    #[must_use]
    pub const fn new(status: u16, error: Error) -> Self {
        Self { status, error }
    }

    /// Convert into a serializable [`ErrorResponse`].
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error.error_code().to_string(),
                message: self.error.to_string(),
            },
            status: self.status,
        }
    }
}

impl From<Error> for StatusError {
    fn from(error: Error) -> Self {
        Self {
            status: error.default_status(),
            error,
        }
    }
}

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Transport status code
    pub status: u16,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::HttpStatus { .. } => "HTTP_STATUS",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::UnexpectedRecordCount(_) => "UNEXPECTED_RECORD_COUNT",
            Self::MalformedGroup(_) => "MALFORMED_GROUP",
            Self::NoMatchingGroup(_) => "NO_MATCHING_GROUP",
        }
    }

    /// Returns true for failures of the connection to the directory or its API.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::HttpStatus { .. }
                | Self::Timeout(_)
                | Self::ServiceUnavailable(_)
                | Self::ExternalServiceError { .. }
        )
    }

    /// Status code to report when no other status is known.
    #[must_use]
    pub const fn default_status(&self) -> u16 {
        match self {
            Self::HttpStatus { status, .. } => *status,
            _ if self.is_transport() => TRANSPORT_FAILURE_STATUS,
            _ => NO_TRANSPORT_STATUS,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ValidationError(_)
                | Self::ExternalServiceError { .. }
                | Self::MalformedGroup(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::DecodeError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
