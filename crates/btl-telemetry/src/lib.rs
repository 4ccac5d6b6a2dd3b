//! btl Telemetry - logging setup and request correlation.
//!
//! # Example
//!
//! ```rust,no_run
//! use btl_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), btl_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directives(["hyper=warn"]);
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("gateway").with_operation("generate_validated");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("generating");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
