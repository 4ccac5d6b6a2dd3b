//! btl Gateway - schema-guaranteed results from unreliable text generators.
//!
//! This crate provides:
//! - [`GenerationRequest`] validation before anything goes upstream
//! - A [`GenerationProvider`] trait with Claude and OpenAI-compatible clients
//! - A per-model temperature [`CapabilityTable`]
//! - A small [`ResultSchema`] language and JSON extraction from free text
//! - The [`Gateway`]: one attempt, one strict retry, then the caller's fallback
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use btl_gateway::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> GatewayResult<()> {
//! let config = ProviderConfig::new("sk-ant-...", "claude-sonnet-4-20250514");
//! let provider = ClaudeProvider::new(config)?;
//! let gateway = Gateway::new(Arc::new(provider));
//!
//! let schema = ResultSchema::new()
//!     .field("title", FieldSchema::required(FieldKind::String));
//! let spec = GenerationSpec::new(
//!     GenerationRequest::new("Name the chapter.", "The crew reaches the harbour."),
//!     schema,
//!     json!({"title": "Untitled"}),
//! )?;
//!
//! let out = gateway.generate_validated(&spec).await?;
//! println!("{} via {:?}", out.value, out.source);
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

mod claude;
mod error;
mod extract;
mod gateway;
mod observer;
mod openai_compat;
mod provider;
mod request;
mod schema;
mod temperature;

pub use claude::ClaudeProvider;
pub use error::{GatewayError, GatewayResult};
pub use extract::extract_json;
pub use gateway::{Gateway, GatewayConfig, GenerationSpec, OutputSource, ValidatedOutput};
pub use observer::{Attempt, TracingObserver, ValidationFailure, ValidationObserver};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{GenerationProvider, ProviderCall, ProviderConfig, ProviderReply};
pub use request::{GenerationOutput, GenerationRequest, RequestLimits};
pub use schema::{FieldKind, FieldSchema, ResultSchema, SchemaViolation};
pub use temperature::{CapabilityTable, DEFAULT_TEMPERATURE_RANGE, TemperaturePolicy};
