//! HTTP error mapping.
//!
//! Every failure leaves the service as `{error, message?}` where `error` is
//! one of a fixed set of codes.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use btl_gateway::GatewayError;
use btl_store::StoreError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Key store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generation gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The request body or parameters were rejected by the HTTP layer.
    #[error("validation error: {0}")]
    Validation(String),

    /// The raw request body exceeded the configured cap.
    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// No route matched.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub error: &'static str,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.code(),
            Self::Gateway(e) => e.code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.code() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "UPSTREAM_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            "UPSTREAM_TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Gateway(GatewayError::RateLimited { retry_after_secs }) => *retry_after_secs,
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Configuration detail stays in the log.
            error!(error = %self, "internal error");
            None
        } else {
            Some(self.to_string())
        };

        let body = ErrorBody {
            error: self.code(),
            message,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_store_error_statuses() {
        assert_eq!(
            status_of(StoreError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::NotFound("k".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::AlreadyExists("k".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::PayloadTooLarge { size: 2, limit: 1 }.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(StoreError::Unavailable("down".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_gateway_error_statuses() {
        assert_eq!(
            status_of(GatewayError::Timeout("slow".into()).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(GatewayError::Upstream("503".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(GatewayError::Config("no key".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::from(GatewayError::RateLimited {
            retry_after_secs: Some(7),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    }

    #[test]
    fn test_http_layer_errors() {
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.code(),
            "PAYLOAD_TOO_LARGE"
        );
        assert_eq!(ApiError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(
            status_of(ApiError::NotFound("/nope".into())),
            StatusCode::NOT_FOUND
        );
    }
}
