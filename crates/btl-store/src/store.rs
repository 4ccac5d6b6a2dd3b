//! Key store operations.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::KvBackend;
use crate::error::{StoreError, StoreResult};
use crate::key::RecordKey;
use crate::record::{Record, StoredRecord, merge_patch};

/// Default cap on an encoded value (256 KiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Limits enforced before the backend is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum size of a value's JSON encoding, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl StoreLimits {
    /// Reject a payload of `size` bytes if it exceeds the cap.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PayloadTooLarge`] when `size` is over the limit.
    pub fn check_payload_len(&self, size: usize) -> StoreResult<()> {
        if size > self.max_payload_bytes {
            return Err(StoreError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    fn check_value(&self, value: &Value) -> StoreResult<()> {
        let size = serde_json::to_vec(value)
            .map_err(|e| StoreError::Validation(format!("value is not encodable: {e}")))?
            .len();
        self.check_payload_len(size)
    }
}

/// Keyed document store.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct KeyStore {
    backend: Arc<dyn KvBackend>,
    limits: StoreLimits,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Create a store with default limits.
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_limits(backend, StoreLimits::default())
    }

    /// Create a store with explicit limits.
    #[must_use]
    pub fn with_limits(backend: Arc<dyn KvBackend>, limits: StoreLimits) -> Self {
        Self { backend, limits }
    }

    /// The limits this store enforces.
    #[must_use]
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Fetch the record for `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for a bad key, [`StoreError::NotFound`] if
    /// absent, [`StoreError::Unavailable`] on backend failure.
    pub async fn get(&self, key: &str) -> StoreResult<Record> {
        let key = RecordKey::parse(key)?;
        debug!(key = %key, "store get");

        let bytes = self
            .backend
            .get(key.as_str())
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store get failed"))?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        StoredRecord::decode(&key, &bytes)
    }

    /// Create or replace the record for `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`], [`StoreError::PayloadTooLarge`] or
    /// [`StoreError::Unavailable`].
    pub async fn put(&self, key: &str, value: Value) -> StoreResult<()> {
        let key = RecordKey::parse(key)?;
        self.limits.check_value(&value)?;
        debug!(key = %key, "store put");

        let bytes = StoredRecord::new(&key, value, Utc::now()).encode()?;
        self.backend
            .set(key.as_str(), bytes)
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store put failed"))
    }

    /// Create the record for `key`, failing if one already exists.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if the key holds a record, plus the
    /// errors of [`put`](Self::put).
    pub async fn create(&self, key: &str, value: Value) -> StoreResult<()> {
        let key = RecordKey::parse(key)?;
        self.limits.check_value(&value)?;
        debug!(key = %key, "store create");

        let bytes = StoredRecord::new(&key, value, Utc::now()).encode()?;
        let inserted = self
            .backend
            .insert_if_absent(key.as_str(), bytes)
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store create failed"))?;
        if inserted {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists(key.to_string()))
        }
    }

    /// Merge `partial` into the record for `key`.
    ///
    /// Objects are shallow-merged with `partial` winning; any other pairing
    /// replaces the stored value. The merged result is size-checked again
    /// before it is written.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if absent, plus the errors of
    /// [`put`](Self::put).
    pub async fn patch(&self, key: &str, partial: Value) -> StoreResult<()> {
        let key = RecordKey::parse(key)?;
        self.limits.check_value(&partial)?;
        debug!(key = %key, "store patch");

        let current = self
            .backend
            .get(key.as_str())
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store patch read failed"))?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let current = StoredRecord::decode(&key, &current)?;

        let merged = merge_patch(current.value, partial);
        self.limits.check_value(&merged)?;

        let bytes = StoredRecord::new(&key, merged, Utc::now()).encode()?;
        self.backend
            .set(key.as_str(), bytes)
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store patch write failed"))
    }

    /// Delete the record for `key`. Succeeds whether or not it existed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] or [`StoreError::Unavailable`].
    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = RecordKey::parse(key)?;
        let existed = self
            .backend
            .delete(key.as_str())
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "store delete failed"))?;
        debug!(key = %key, existed, "store delete");
        Ok(())
    }
}
