//! Application state shared by handlers.

use btl_gateway::Gateway;
use btl_store::KeyStore;
use chrono::{DateTime, Utc};

/// Shared application state.
///
/// Long-lived clients are built once by the entry point and cloned per
/// request; every field is cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Key store.
    pub store: KeyStore,
    /// Generation gateway.
    pub gateway: Gateway,
    /// Service version.
    pub version: String,
    /// Process start time.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(store: KeyStore, gateway: Gateway) -> Self {
        Self {
            store,
            gateway,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since `started_at`; zero if the clock moved backwards.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        u64::try_from(elapsed.num_seconds()).unwrap_or(0)
    }

    /// Largest accepted key store body, in bytes.
    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.store.limits().max_payload_bytes
    }
}
