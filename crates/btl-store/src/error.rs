//! Store error types.

/// Errors from key store operations.
///
/// Every variant maps to a stable wire code (see [`StoreError::code`]).
/// Nothing is retried internally: `get`, `put` and `delete` are safe for
/// callers to retry, `create` and `patch` are not without an existence check.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key or request failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// No record exists for the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// `create` was called for a key that already holds a record.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The payload exceeds the configured size cap.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Encoded payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The backend failed or returned data that could not be decoded.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "CONFLICT",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Unavailable(_) => "UPSTREAM_UNAVAILABLE",
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
