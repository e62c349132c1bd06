//! Error types for the Tollgate service.

use thiserror::Error;

use crate::provider::ProviderError;

/// Main error type for process-level Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration source errors
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;

/// Failures raised while admitting a request.
///
/// Every variant is rendered to the caller as the JSON error envelope; see
/// `http::envelope` for the status mapping.
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// No credential is configured and the process is not in debug mode.
    #[error("API key not configured")]
    Configuration,

    /// The caller sent no credential.
    #[error("API key is required")]
    MissingCredential,

    /// The caller sent a credential that does not match.
    #[error("Invalid API key")]
    InvalidCredential,

    /// The caller exhausted its budget for the current window.
    #[error("Rate limit exceeded. Max {limit} requests per {window_secs} seconds.")]
    RateLimitExceeded { limit: u64, window_secs: u64 },

    /// Malformed or incomplete request body.
    #[error("{0}")]
    BadRequest(String),

    /// No route matched.
    #[error("Not Found")]
    NotFound,

    /// An external provider failed.
    #[error("Internal server error")]
    Downstream(#[from] ProviderError),
}
