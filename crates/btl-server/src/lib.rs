//! btl Server - HTTP service for the key store and generation gateway.
//!
//! Routes:
//!
//! - `GET|PUT|POST|PATCH|DELETE /kv/{key}` - key store
//! - `POST /generate` - one raw upstream call
//! - `POST /generate/validated` - retry-then-fallback generation
//! - `GET /health`, `GET /api/health`, `GET /`, `GET /api` - service endpoints
//!
//! Every error leaves as `{error, message?}` with a stable code; see
//! [`ApiError`]. Configuration is converted to domain types in [`bridge`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod error;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorBody};
pub use response::{ApiResponse, HealthResponse, ServiceInfo};
pub use routes::{cors_layer, create_router};
pub use server::Server;
pub use state::AppState;
