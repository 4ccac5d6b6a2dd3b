//! Record key validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Maximum key length in characters.
pub const MAX_KEY_LEN: usize = 512;

/// A validated record key.
///
/// Keys are 1–512 characters drawn from ASCII letters, digits, and
/// `:` `_` `-` `.`. Anything else (including `/`, whitespace and non-ASCII)
/// is rejected before the backend is touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey(String);

impl RecordKey {
    /// Validate and wrap a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the key is empty, too long, or
    /// contains a character outside the allow-list.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        if raw.is_empty() {
            return Err(StoreError::Validation("key must not be empty".into()));
        }
        // Allowed characters are all single-byte, so byte length is exact
        // once the charset check passes; check it first to bound the scan.
        if raw.len() > MAX_KEY_LEN {
            return Err(StoreError::Validation(format!(
                "key is {} bytes, exceeding the {MAX_KEY_LEN} character limit",
                raw.len()
            )));
        }
        if let Some(bad) = raw.chars().find(|c| !is_key_char(*c)) {
            return Err(StoreError::Validation(format!(
                "key contains disallowed character {bad:?}"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.')
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordKey {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        Self::parse(&value)
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}
