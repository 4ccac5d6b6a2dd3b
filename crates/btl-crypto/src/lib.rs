//! btl Crypto - MAC primitives for capability links.
//!
//! This crate provides:
//! - [`LinkSecret`]: a zeroizing server secret, never printed
//! - [`Mac`]: keyed BLAKE3 tags with constant-time comparison
//! - [`Nonce`]: 128-bit random values, unique per issuance
//!
//! # Example
//!
//! ```
//! use btl_crypto::{LinkSecret, Mac, Nonce};
//!
//! let secret = LinkSecret::generate();
//! let nonce = Nonce::generate();
//!
//! let tag = Mac::compute(&secret, nonce.as_bytes());
//! assert!(tag.verify(&secret, nonce.as_bytes()));
//!
//! let other = LinkSecret::generate();
//! assert!(!tag.verify(&other, nonce.as_bytes()));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod mac;
mod nonce;
mod secret;

pub use error::{CryptoError, CryptoResult};
pub use mac::{MAC_LEN, Mac};
pub use nonce::{NONCE_LEN, Nonce};
pub use secret::{LinkSecret, MIN_SECRET_LEN};
