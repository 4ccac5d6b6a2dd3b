//! btl Links - signed, time-bounded capability links.
//!
//! A capability link authorizes access to one resource until an absolute
//! expiry, without any server-side lookup. The link carries the resource
//! id, the expiry, a random nonce and a MAC over all three; anyone holding
//! the server secret can check it.
//!
//! Verification checks expiry first, then recomputes the MAC and compares
//! in constant time. Links cannot be revoked before they expire.
//!
//! # Example
//!
//! ```
//! use btl_crypto::LinkSecret;
//! use btl_links::{CapabilityLink, LinkStatus, issue, verify};
//! use chrono::Duration;
//!
//! let secret = LinkSecret::generate();
//! let link = issue("doc1", &secret, Duration::minutes(5)).unwrap();
//! assert_eq!(verify(&link, &secret), LinkStatus::Valid);
//!
//! let query = link.to_query();
//! let parsed = CapabilityLink::from_query(&query).unwrap();
//! assert_eq!(verify(&parsed, &secret), LinkStatus::Valid);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod codec;
mod error;
mod link;

pub use error::{LinkError, LinkResult};
pub use link::{
    CapabilityLink, InvalidReason, LinkStatus, MAX_RESOURCE_ID_LEN, issue, issue_at, verify,
    verify_at, verify_query,
};
