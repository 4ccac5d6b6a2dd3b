//! Server secret for capability links.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Minimum secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Domain separation context for link MAC keys.
const KEY_CONTEXT: &str = "btl capability link v1";

/// A link-signing secret.
///
/// Raw secret material is never stored: on construction it is run through
/// BLAKE3 key derivation and only the derived 32-byte MAC key is kept. The
/// key is zeroized on drop and never appears in `Debug` output.
#[derive(Clone, ZeroizeOnDrop)]
pub struct LinkSecret {
    key: [u8; 32],
}

impl LinkSecret {
    /// Derive a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecretTooShort`] if fewer than
    /// [`MIN_SECRET_LEN`] bytes are supplied.
    pub fn from_bytes(raw: &[u8]) -> CryptoResult<Self> {
        if raw.len() < MIN_SECRET_LEN {
            return Err(CryptoError::SecretTooShort {
                minimum: MIN_SECRET_LEN,
                actual: raw.len(),
            });
        }
        Ok(Self {
            key: blake3::derive_key(KEY_CONTEXT, raw),
        })
    }

    /// Derive a secret from a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHexEncoding`] for bad hex, or
    /// [`CryptoError::SecretTooShort`] if the decoded value is too short.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?);
        Self::from_bytes(&raw)
    }

    /// Generate a fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut raw = [0u8; MIN_SECRET_LEN];
        OsRng.fill_bytes(&mut raw);
        let secret = Self {
            key: blake3::derive_key(KEY_CONTEXT, &raw),
        };
        raw.zeroize();
        secret
    }

    /// Generate random secret material as hex, suitable for configuration.
    #[must_use]
    pub fn generate_hex() -> String {
        let mut raw = Zeroizing::new([0u8; MIN_SECRET_LEN]);
        OsRng.fill_bytes(&mut raw[..]);
        hex::encode(&raw[..])
    }

    pub(crate) fn mac_key(&self) -> &[u8; 32] {
        &self.key
    }
}

impl fmt::Debug for LinkSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkSecret([REDACTED])")
    }
}
