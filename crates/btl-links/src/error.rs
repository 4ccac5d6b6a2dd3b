//! Link issuance errors.
//!
//! Verification never errors; it returns a [`LinkStatus`](crate::LinkStatus).

use thiserror::Error;

/// Errors from issuing a capability link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The resource id is empty or too long.
    #[error("invalid resource id: {0}")]
    InvalidResource(String),

    /// The TTL is not positive or pushes the expiry out of range.
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
}

/// Result type for link issuance.
pub type LinkResult<T> = Result<T, LinkError>;
