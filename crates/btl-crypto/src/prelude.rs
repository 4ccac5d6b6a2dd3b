//! Prelude module - commonly used types for convenient import.
//!
//! ```
//! use btl_crypto::prelude::*;
//!
//! let secret = LinkSecret::generate();
//! let tag = Mac::compute(&secret, b"message");
//! assert!(tag.verify(&secret, b"message"));
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Key material
pub use crate::LinkSecret;

// Tags and nonces
pub use crate::{Mac, Nonce};
