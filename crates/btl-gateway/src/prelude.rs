//! Prelude module - commonly used types for convenient import.
//!
//! Use `use btl_gateway::prelude::*;` to import all essential types.

// Errors
pub use crate::{GatewayError, GatewayResult};

// Gateway
pub use crate::{Gateway, GatewayConfig, GenerationSpec, OutputSource, ValidatedOutput};

// Requests
pub use crate::{GenerationOutput, GenerationRequest, RequestLimits};

// Schemas
pub use crate::{FieldKind, FieldSchema, ResultSchema};

// Providers
pub use crate::{ClaudeProvider, GenerationProvider, OpenAiCompatProvider, ProviderConfig};

// Temperature
pub use crate::{CapabilityTable, TemperaturePolicy};

// Observation
pub use crate::{TracingObserver, ValidationObserver};
