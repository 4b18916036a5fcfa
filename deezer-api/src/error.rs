//! Error types for the Deezer API client.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when talking to the gateway, auth or media services.
#[derive(Debug, Error)]
pub enum DeezerError {
    /// HTTP transport error (connection refused, timeout, TLS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-empty `error` object.
    ///
    /// Common keys:
    /// - `USER_AUTH_ERROR`: wrong email or password
    /// - `VALID_TOKEN_REQUIRED`: sid missing or expired
    /// - `DATA_ERROR`: unknown entity id
    #[error("{message}")]
    Gateway {
        /// Human-readable summary listing every error entry.
        message: String,
        /// The original structured error map.
        errors: Map<String, Value>,
    },

    /// The media service answered with a non-200 status.
    #[error("media API returned status {status}: {message}")]
    Media {
        status: u16,
        message: String,
        /// The response body, or `Value::Null` when it was not JSON.
        errors: Value,
    },

    /// Operation not allowed in the auth token's current lifecycle state.
    #[error("auth token error: {0}")]
    AuthToken(String),

    /// A compact token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Operation invoked out of order (e.g. restoring a session before sign-in).
    #[error("invalid state: {0}")]
    State(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure in the content-protection core.
    #[error(transparent)]
    Crypt(#[from] dzcrypt::CryptError),

    /// File I/O error (session read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for unexpected response shapes.
    #[error("{0}")]
    Other(String),
}

impl DeezerError {
    /// Whether this is a gateway error whose map contains `key`.
    pub fn has_gateway_error(&self, key: &str) -> bool {
        matches!(self, Self::Gateway { errors, .. } if errors.contains_key(key))
    }
}

/// Convenience alias for `Result<T, DeezerError>`.
pub type Result<T> = std::result::Result<T, DeezerError>;
