//! Gateway error types.
//!
//! Schema validation failures never appear here: they are absorbed by the
//! retry-then-fallback protocol. Only request problems and infrastructure
//! failures surface.

use thiserror::Error;

/// Errors that can occur with generation requests.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was rejected before any upstream call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The upstream call did not complete within the configured timeout.
    #[error("upstream timed out: {0}")]
    Timeout(String),

    /// Network failure, 5xx or other provider-side failure.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// The provider rejected the call for rate limiting.
    #[error("rate limited by upstream")]
    RateLimited {
        /// Seconds the provider asked callers to wait, if it said.
        retry_after_secs: Option<u64>,
    },

    /// The provider is misconfigured (missing key, bad header value).
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout(_) => "UPSTREAM_TIMEOUT",
            Self::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Upstream(e.to_string())
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
