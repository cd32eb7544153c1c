//! Error types for the Sweet Shop client.
//!
//! Two layers: [`AuthError`] for session-lifecycle failures and [`ApiError`]
//! for everything a gateway request can produce. `AuthError` nests inside
//! `ApiError` so callers can match on one type.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server rejected the supplied email/password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token refresh failed: no refresh token stored, or the server
    /// rejected the stored one. The session has been torn down.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// An operation that needs a session was called without one.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Errors that can occur when talking to the Sweet Shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Session-lifecycle failure.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The request could not be completed (DNS, connect, TLS, ...).
    #[error("network error: {0}")]
    Network(reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message when present, generic fallback otherwise.
        message: String,
    },

    /// The response body could not be deserialized.
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Client-side input validation failed before submission.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description of the problem.
        message: String,
    },

    /// Credential storage failed.
    #[error("credential store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Configuration failed to load.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ApiError {
    /// Classify a transport failure, separating timeouts from other
    /// network errors.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }

    /// The HTTP status of a [`ApiError::Server`] error, if that is what
    /// this is.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
