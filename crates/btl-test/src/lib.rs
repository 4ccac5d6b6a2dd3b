//! btl Test - shared test utilities.
//!
//! Deterministic doubles for the two seams the server injects at startup
//! (the generation provider and the key-value backend), plus fixtures.
//!
//! ```toml
//! [dev-dependencies]
//! btl-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use btl_test::{ScriptedProvider, ScriptedTurn};
//!
//! let provider = ScriptedProvider::new(vec![
//!     ScriptedTurn::text("not json"),
//!     ScriptedTurn::text(r#"{"title": "ok"}"#),
//! ]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mock_backend;
pub mod mock_provider;

pub use fixtures::*;
pub use mock_backend::*;
pub use mock_provider::*;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
