//! Instrumented key-value backends.

use std::sync::Mutex;

use async_trait::async_trait;

use btl_store::{KvBackend, MemoryBackend, StoreError, StoreResult};

/// A backend operation, as recorded by [`CountingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    /// `get(key)`
    Get(String),
    /// `set(key, len)`
    Set(String, usize),
    /// `delete(key)`
    Delete(String),
    /// `insert_if_absent(key, len)`
    InsertIfAbsent(String, usize),
}

/// In-memory backend that records every call.
///
/// Used to prove that rejected requests never reach storage.
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: MemoryBackend,
    ops: Mutex<Vec<BackendOp>>,
}

impl CountingBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn ops(&self) -> Vec<BackendOp> {
        self.ops.lock().expect("lock poisoned").clone()
    }

    /// Number of operations so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.ops.lock().expect("lock poisoned").len()
    }

    /// Forget recorded operations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn reset(&self) {
        self.ops.lock().expect("lock poisoned").clear();
    }

    fn record(&self, op: BackendOp) {
        self.ops.lock().expect("lock poisoned").push(op);
    }
}

#[async_trait]
impl KvBackend for CountingBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.record(BackendOp::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.record(BackendOp::Set(key.to_string(), value.len()));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.record(BackendOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn insert_if_absent(&self, key: &str, value: Vec<u8>) -> StoreResult<bool> {
        self.record(BackendOp::InsertIfAbsent(key.to_string(), value.len()));
        self.inner.insert_if_absent(key, value).await
    }
}

/// Backend whose every call fails with [`StoreError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct FailingBackend;

impl FailingBackend {
    fn fail<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }
}

#[async_trait]
impl KvBackend for FailingBackend {
    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Self::fail()
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> StoreResult<()> {
        Self::fail()
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        Self::fail()
    }
}
