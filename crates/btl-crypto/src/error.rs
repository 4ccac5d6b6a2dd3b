//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Secret material is shorter than the minimum.
    #[error("secret too short: need at least {minimum} bytes, got {actual}")]
    SecretTooShort {
        /// Minimum length in bytes.
        minimum: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid fixed-size value length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
