//! Convenience re-exports.
//!
//! ```
//! use btl_telemetry::prelude::*;
//! ```

pub use crate::{
    LogConfig, LogFormat, LogTarget, RequestContext, TelemetryError, TelemetryResult,
    setup_logging,
};
