//! Error types for the SolarSync API client.
//!
//! # Design
//! Ordinary non-2xx responses are not errors at the request level: they come
//! back as an `ApiResponse` whose `ok()` is false. `ApiError` covers what
//! stops a response from existing at all (transport failure, timeout,
//! cancellation, an unbuildable request) and what goes wrong when a caller
//! asks for a body the response cannot provide.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The connection could not be established or broke mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// The transport gave up waiting. Only possible when a timeout is configured.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The caller's cancellation token fired before the response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The request could not be assembled (bad header, bad base URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The body does not match the declared response shape.
    #[error("response does not match {expected}: {message}")]
    SchemaMismatch {
        expected: &'static str,
        message: String,
    },

    /// Success data was requested from a non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl ApiError {
    /// True for failures of the transport itself, as opposed to failures
    /// of building a request or reading a response.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Cancelled
        )
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
