//! Error types for cubefetch-client

use thiserror::Error;

/// Errors that can occur while building or executing a query.
///
/// Payloads are plain strings so the error is `Clone`: a single failure is
/// handed to every caller waiting on a coalesced request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Could not reach the endpoint
    #[error("connection failed: {0}")]
    Connection(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Endpoint asked us to slow down
    #[error("rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Response body was not a valid SPARQL results document
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Identifier is not an absolute IRI usable in a query
    #[error("invalid IRI: {0}")]
    InvalidIri(String),

    /// Client or loader misconfiguration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Some batches of a load failed
    #[error("{failed} of {total} batches failed")]
    PartialFailure { failed: usize, total: usize },
}

impl FetchError {
    /// Create an Http error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a Connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a MalformedResponse error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) | Self::RateLimited { .. } => true,
            // 500 usually means the query itself failed on the endpoint
            Self::Http { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Connection(format!("request failed: {}", err))
        }
    }
}

/// Result type for cubefetch-client operations
pub type Result<T> = std::result::Result<T, FetchError>;
