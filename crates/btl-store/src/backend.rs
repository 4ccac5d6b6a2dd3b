//! Raw key-value backends.
//!
//! The [`KvBackend`] trait provides byte-level `get`/`set`/`delete` plus a
//! conditional insert. Implementations:
//!
//! - **In-memory** (always available): for tests and ephemeral deployments
//! - **`SurrealKV`** (behind the `surrealkv` feature): persistent, ACID,
//!   embedded LSM-tree storage
//!
//! Backends know nothing about record semantics; validation, size limits
//! and merge rules live in [`KeyStore`](crate::KeyStore).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Raw key-value backend.
///
/// Failures are reported as [`StoreError::Unavailable`].
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Get the bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Delete `key`. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Store `value` only if `key` is absent. Returns `true` if written.
    ///
    /// The default implementation is check-then-write: two concurrent
    /// callers can both observe the key as absent and both write, the last
    /// one winning. Backends with a native conditional insert override it.
    async fn insert_if_absent(&self, key: &str, value: Vec<u8>) -> StoreResult<bool> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.set(key, value).await?;
        Ok(true)
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("memory backend lock poisoned: {e}"))
}

/// In-memory backend.
///
/// `insert_if_absent` runs under a single write lock and is atomic.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.data.read().map_err(lock_err)?.len())
    }

    /// Whether the backend holds no keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut data = self.data.write().map_err(lock_err)?;
        Ok(data.remove(key).is_some())
    }

    async fn insert_if_absent(&self, key: &str, value: Vec<u8>) -> StoreResult<bool> {
        let mut data = self.data.write().map_err(lock_err)?;
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_owned(), value);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// SurrealKV implementation (behind `surrealkv` feature)
// ---------------------------------------------------------------------------

/// Persistent backend on `SurrealKV`.
///
/// Every operation runs in its own transaction. `insert_if_absent` reads and
/// writes inside one transaction, so a concurrent writer to the same key
/// makes the commit fail instead of silently overwriting.
#[cfg(feature = "surrealkv")]
pub struct SurrealKvBackend {
    tree: surrealkv::Tree,
}

#[cfg(feature = "surrealkv")]
impl std::fmt::Debug for SurrealKvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvBackend").finish_non_exhaustive()
    }
}

#[cfg(feature = "surrealkv")]
impl SurrealKvBackend {
    /// Open a store at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { tree })
    }

    /// Flush pending writes and close the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the flush fails.
    pub async fn close(&self) -> StoreResult<()> {
        self.tree.close().await.map_err(|ref e| map_kv_err(e))
    }
}

#[cfg(feature = "surrealkv")]
fn map_kv_err(e: &surrealkv::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[cfg(feature = "surrealkv")]
#[async_trait]
impl KvBackend for SurrealKvBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        tx.get(key.as_bytes()).map_err(|ref e| map_kv_err(e))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        tx.set(key.as_bytes(), &value)
            .map_err(|ref e| map_kv_err(e))?;
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        let existed = tx
            .get(key.as_bytes())
            .map_err(|ref e| map_kv_err(e))?
            .is_some();
        if existed {
            tx.delete(key.as_bytes()).map_err(|ref e| map_kv_err(e))?;
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        }
        Ok(existed)
    }

    async fn insert_if_absent(&self, key: &str, value: Vec<u8>) -> StoreResult<bool> {
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        if tx
            .get(key.as_bytes())
            .map_err(|ref e| map_kv_err(e))?
            .is_some()
        {
            return Ok(false);
        }
        tx.set(key.as_bytes(), &value)
            .map_err(|ref e| map_kv_err(e))?;
        tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        Ok(true)
    }
}
