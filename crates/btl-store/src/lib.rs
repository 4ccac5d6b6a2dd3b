//! btl Store - keyed document store with explicit existence rules.
//!
//! This crate provides:
//! - Key validation against an allow-listed charset
//! - Payload size limits enforced before any backend access
//! - `get` / `put` / `create` / `patch` / `delete` with stable error semantics
//! - A pluggable [`KvBackend`] (in-memory, or `SurrealKV` behind the
//!   **`surrealkv`** feature)
//!
//! # Consistency
//!
//! Each key holds at most one live record. Writes are last-writer-wins;
//! concurrent `put`/`patch` on the same key race without application-level
//! locking. `create` relies on the backend's
//! [`insert_if_absent`](KvBackend::insert_if_absent), which is atomic for the
//! bundled backends.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use btl_store::{KeyStore, MemoryBackend, StoreError};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StoreError> {
//! let store = KeyStore::new(Arc::new(MemoryBackend::new()));
//!
//! store.put("user:123", json!({"name": "ada"})).await?;
//! let record = store.get("user:123").await?;
//! assert_eq!(record.value, json!({"name": "ada"}));
//!
//! let err = store.create("user:123", json!({})).await.unwrap_err();
//! assert!(matches!(err, StoreError::AlreadyExists(_)));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backend;
pub mod error;

mod key;
mod record;
mod store;

pub use backend::{KvBackend, MemoryBackend};
pub use error::{StoreError, StoreResult};
pub use key::{MAX_KEY_LEN, RecordKey};
pub use record::{Record, merge_patch};
pub use store::{DEFAULT_MAX_PAYLOAD_BYTES, KeyStore, StoreLimits};

#[cfg(feature = "surrealkv")]
pub use backend::SurrealKvBackend;
