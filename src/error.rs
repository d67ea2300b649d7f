//! Error types for the market-data cache.

use std::time::Duration;

use thiserror::Error;

/// The main error type for all cache and fetch operations.
///
/// Every variant is scoped to a single query attempt. None of them leave the
/// cache or the rate limiter in an inconsistent state, so callers are free to
/// retry.
#[derive(Error, Debug)]
pub enum MarketError {
    /// The global rate limiter denied the outbound call.
    #[error("Rate limited, retry after {:.1}s", .retry_after.as_secs_f64())]
    RateLimited {
        /// Time left until the limiter admits another call
        retry_after: Duration,
    },

    /// The request could not be delivered or the API answered with a failure status
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// The API answered, but the body did not match the listings schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request itself could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl MarketError {
    /// Creates a RateLimited error
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Creates a MalformedResponse error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Suggested wait before retrying, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if retrying the same query later can succeed.
    ///
    /// Malformed responses are retryable as well, they usually point at an
    /// upstream schema change but the next snapshot may parse.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }

    /// Check if this is a rate limit denial.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Underlying cause of a [`MarketError::FetchFailed`].
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// Non-success status code
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status returned by the API
        status: reqwest::StatusCode,
        /// Response body, kept for diagnostics
        body: String,
    },
}

impl FetchError {
    /// Status code of the failed response, if the API answered at all.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            Self::HttpMiddleware(reqwest_middleware::Error::Reqwest(e)) => e.status(),
            Self::HttpMiddleware(_) => None,
        }
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        Self::FetchFailed(FetchError::Http(err))
    }
}

impl From<reqwest_middleware::Error> for MarketError {
    fn from(err: reqwest_middleware::Error) -> Self {
        Self::FetchFailed(FetchError::HttpMiddleware(err))
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for MarketError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<url::ParseError> for MarketError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
