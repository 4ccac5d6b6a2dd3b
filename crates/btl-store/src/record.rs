//! Record model and persisted layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::key::RecordKey;

/// Fixed version marker written with every persisted record.
const RECORD_VERSION: &str = "v0";

/// One key's stored document plus its update metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record key.
    pub key: RecordKey,
    /// Stored document.
    pub value: Value,
    /// When the record was last written.
    pub last_updated: DateTime<Utc>,
}

/// On-disk layout: `(key, version marker, value, updatedAt)`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredRecord {
    key: String,
    version: String,
    value: Value,
    updated_at: DateTime<Utc>,
}

impl StoredRecord {
    pub(crate) fn new(key: &RecordKey, value: Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.as_str().to_owned(),
            version: RECORD_VERSION.to_owned(),
            value,
            updated_at,
        }
    }

    pub(crate) fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Decode a persisted record, rejecting foreign version markers and
    /// records filed under the wrong key.
    pub(crate) fn decode(key: &RecordKey, bytes: &[u8]) -> StoreResult<Record> {
        let stored: Self = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Unavailable(format!("corrupt record for {key}: {e}")))?;
        if stored.version != RECORD_VERSION {
            return Err(StoreError::Unavailable(format!(
                "record for {key} has unsupported version marker {:?}",
                stored.version
            )));
        }
        if stored.key != key.as_str() {
            return Err(StoreError::Unavailable(format!(
                "record filed under {key} claims key {:?}",
                stored.key
            )));
        }
        Ok(Record {
            key: key.clone(),
            value: stored.value,
            last_updated: stored.updated_at,
        })
    }
}

/// Apply a patch to a stored value.
///
/// When both sides are JSON objects the patch is shallow-merged into the
/// current value, patch keys winning on conflict. In every other case the
/// patch replaces the current value wholesale.
#[must_use]
pub fn merge_patch(current: Value, patch: Value) -> Value {
    match (current, patch) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        },
        (_, patch) => patch,
    }
}
