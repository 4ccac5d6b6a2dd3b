//! Link issuance and verification.

use std::fmt;

use btl_crypto::{LinkSecret, Mac, Nonce};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LinkError, LinkResult};

/// Version prefix for MAC input. Bump when the layout changes.
const SIGNING_DATA_VERSION: u8 = 0x01;

/// Version byte, length prefix, expiry and nonce.
const FIXED_SIGNING_LEN: usize = 1 + 4 + 8 + btl_crypto::NONCE_LEN;

/// Maximum resource id length in bytes.
pub const MAX_RESOURCE_ID_LEN: usize = 512;

/// Write a length-prefixed byte slice to the output buffer.
///
/// Format: 4-byte little-endian length followed by the data.
#[allow(clippy::cast_possible_truncation)]
fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    // Resource ids are capped well below u32::MAX.
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// A signed grant of access to one resource until `expiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityLink {
    /// Resource the link grants access to.
    pub resource_id: String,
    /// Absolute expiry, Unix seconds.
    pub expiry: i64,
    /// Per-issuance random nonce.
    pub nonce: Nonce,
    /// MAC over resource id, expiry and nonce.
    pub signature: Mac,
}

impl CapabilityLink {
    /// Bytes covered by the signature.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data =
            Vec::with_capacity(self.resource_id.len().saturating_add(FIXED_SIGNING_LEN));

        // Version prefix
        data.push(SIGNING_DATA_VERSION);

        // Resource id
        write_length_prefixed(&mut data, self.resource_id.as_bytes());

        // Expiry
        data.extend_from_slice(&self.expiry.to_le_bytes());

        // Nonce
        data.extend_from_slice(self.nonce.as_bytes());

        data
    }

    /// Expiry as a timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiry, 0)
    }

    /// Whether the link has expired at `now`.
    ///
    /// Any instant after `expiry`, including a fraction of a second, counts.
    /// An expiry outside the representable range is treated as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|expiry| now > expiry)
    }
}

/// Why a link was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The expiry has passed. The signature was not evaluated.
    Expired,
    /// The signature does not match the link contents.
    InvalidSignature,
    /// The encoded link is missing, duplicating or mangling a field.
    Malformed,
}

impl InvalidReason {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Expired => "LINK_EXPIRED",
            Self::InvalidSignature => "LINK_INVALID_SIGNATURE",
            Self::Malformed => "LINK_MALFORMED",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Expired => "link expired",
            Self::InvalidSignature => "invalid link signature",
            Self::Malformed => "malformed link",
        };
        f.write_str(msg)
    }
}

/// Outcome of verifying a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LinkStatus {
    /// The link is authentic and unexpired.
    Valid,
    /// The link must be refused.
    Invalid(InvalidReason),
}

impl LinkStatus {
    /// Whether the link may be honoured.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub(crate) fn resource_id_ok(resource_id: &str) -> bool {
    !resource_id.is_empty() && resource_id.len() <= MAX_RESOURCE_ID_LEN
}

/// Issue a link for `resource_id` valid for `ttl` from now.
///
/// The expiry is rounded up to a whole second, so the link lives at least
/// `ttl`.
///
/// # Errors
///
/// [`LinkError::InvalidResource`] for an empty or oversized resource id,
/// [`LinkError::InvalidTtl`] for a TTL under one second or an expiry out of
/// range.
pub fn issue(resource_id: &str, secret: &LinkSecret, ttl: Duration) -> LinkResult<CapabilityLink> {
    issue_at(resource_id, secret, ttl, Utc::now())
}

/// Issue a link as if the current time were `now`.
///
/// # Errors
///
/// Same as [`issue`].
pub fn issue_at(
    resource_id: &str,
    secret: &LinkSecret,
    ttl: Duration,
    now: DateTime<Utc>,
) -> LinkResult<CapabilityLink> {
    if !resource_id_ok(resource_id) {
        return Err(LinkError::InvalidResource(format!(
            "must be 1 to {MAX_RESOURCE_ID_LEN} bytes, got {}",
            resource_id.len()
        )));
    }
    let ttl_secs = ttl.num_seconds();
    if ttl_secs < 1 {
        return Err(LinkError::InvalidTtl(format!(
            "must be at least one second, got {ttl}"
        )));
    }
    let partial_second = i64::from(now.timestamp_subsec_nanos() > 0);
    let expiry = now
        .timestamp()
        .checked_add(ttl_secs)
        .and_then(|secs| secs.checked_add(partial_second))
        .ok_or_else(|| LinkError::InvalidTtl(format!("expiry overflows for {ttl}")))?;

    let mut link = CapabilityLink {
        resource_id: resource_id.to_owned(),
        expiry,
        nonce: Nonce::generate(),
        signature: Mac::from_bytes([0u8; btl_crypto::MAC_LEN]),
    };
    link.signature = Mac::compute(secret, &link.signing_data());
    debug!(resource_id, expiry, "issued capability link");
    Ok(link)
}

/// Verify `link` against `secret` at the current time.
#[must_use]
pub fn verify(link: &CapabilityLink, secret: &LinkSecret) -> LinkStatus {
    verify_at(link, secret, Utc::now())
}

/// Verify `link` as if the current time were `now`.
///
/// Expiry is checked before the signature; an expired link reports
/// [`InvalidReason::Expired`] whatever its signature.
#[must_use]
pub fn verify_at(link: &CapabilityLink, secret: &LinkSecret, now: DateTime<Utc>) -> LinkStatus {
    if !resource_id_ok(&link.resource_id) {
        return LinkStatus::Invalid(InvalidReason::Malformed);
    }
    if link.is_expired_at(now) {
        debug!(resource_id = %link.resource_id, expiry = link.expiry, "capability link expired");
        return LinkStatus::Invalid(InvalidReason::Expired);
    }
    if !link.signature.verify(secret, &link.signing_data()) {
        debug!(resource_id = %link.resource_id, "capability link signature mismatch");
        return LinkStatus::Invalid(InvalidReason::InvalidSignature);
    }
    LinkStatus::Valid
}

/// Decode a query string and verify the link it carries.
///
/// Decoding failures report [`InvalidReason::Malformed`].
#[must_use]
pub fn verify_query(query: &str, secret: &LinkSecret, now: DateTime<Utc>) -> LinkStatus {
    match CapabilityLink::from_query(query) {
        Ok(link) => verify_at(&link, secret, now),
        Err(reason) => LinkStatus::Invalid(reason),
    }
}
