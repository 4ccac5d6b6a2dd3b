//! Layered configuration for btl.
//!
//! A single [`Config`] is built from, in increasing priority:
//!
//! 1. **Embedded defaults** (`defaults.toml` compiled into the binary)
//! 2. **Environment variables** (`BTL_*`, `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`), fallback only
//! 3. **One config file**: `--config PATH`, else `./btl.toml`, else `~/.btl/config.toml`
//!
//! ```rust,no_run
//! use btl_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("listening on {}", resolved.config.server.listen_addr);
//! ```
//!
//! This crate has no dependencies on other internal btl crates. Conversion
//! into gateway, store and telemetry types happens in the server.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }
}
