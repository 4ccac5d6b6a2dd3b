//! Configuration struct definitions.
//!
//! Every section derives `Deserialize` with `#[serde(default)]` so a partial
//! file only overrides what it names. Sections that hold secrets implement
//! `Debug` and `Serialize` by hand and never emit the secret values.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Key store backend and limits.
    pub store: StoreConfig,
    /// Upstream generation provider.
    pub model: ModelConfig,
    /// Capability link signing.
    pub links: LinksConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen_addr: String,
    /// Origins allowed to make cross-origin requests. Empty denies all.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_owned(),
            cors_origins: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Which key-value backend holds records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; contents are lost on exit.
    #[default]
    Memory,
    /// Embedded `SurrealKV` tree at `store.path`.
    Surrealkv,
}

/// Key store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind.
    pub backend: StoreBackend,
    /// Data directory for durable backends.
    pub path: Option<String>,
    /// Largest accepted serialized value, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            max_payload_bytes: 262_144,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Temperature bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// How one model treats the temperature parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ModelCapability {
    /// Any value in `min..=max`.
    Adjustable {
        /// Lowest accepted value.
        min: f64,
        /// Highest accepted value.
        max: f64,
    },
    /// Only this value.
    Fixed {
        /// The model's fixed temperature.
        value: f64,
    },
    /// The parameter must not be sent.
    Omit,
}

/// Generation provider selection, endpoint and request bounds.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier (`"claude"`, `"openai"`, `"openai-compat"`).
    pub provider: String,
    /// Default model when a request names none.
    pub model: String,
    /// API key. Prefer environment variables over storing this in a file.
    pub api_key: Option<String>,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Per-call upstream timeout.
    pub timeout_secs: u64,
    /// Token bound used when a request sets none.
    pub max_tokens: u32,
    /// Largest token bound a request may ask for.
    pub max_tokens_limit: u32,
    /// Longest accepted input, in characters.
    pub max_input_chars: usize,
    /// Longest accepted system prompt, in characters.
    pub max_system_prompt_chars: usize,
    /// Temperature used when a request sets none.
    pub temperature: f64,
    /// Temperature requested for the strict retry.
    pub strict_temperature: f64,
    /// Range for models missing from `models`.
    pub temperature_range: TemperatureRange,
    /// Capability table keyed by exact model id.
    pub models: BTreeMap<String, ModelCapability>,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_api_url", &self.api_url.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("max_tokens_limit", &self.max_tokens_limit)
            .field("max_input_chars", &self.max_input_chars)
            .field("max_system_prompt_chars", &self.max_system_prompt_chars)
            .field("temperature", &self.temperature)
            .field("strict_temperature", &self.strict_temperature)
            .field("temperature_range", &self.temperature_range)
            .field("models", &self.models)
            .finish()
    }
}

impl Serialize for ModelConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModelConfig", 11)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("model", &self.model)?;
        // api_key and api_url are intentionally omitted.
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.serialize_field("max_tokens", &self.max_tokens)?;
        state.serialize_field("max_tokens_limit", &self.max_tokens_limit)?;
        state.serialize_field("max_input_chars", &self.max_input_chars)?;
        state.serialize_field("max_system_prompt_chars", &self.max_system_prompt_chars)?;
        state.serialize_field("temperature", &self.temperature)?;
        state.serialize_field("strict_temperature", &self.strict_temperature)?;
        state.serialize_field("temperature_range", &self.temperature_range)?;
        state.serialize_field("models", &self.models)?;
        state.end()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "claude".to_owned(),
            model: "claude-sonnet-4-20250514".to_owned(),
            api_key: None,
            api_url: None,
            timeout_secs: 60,
            max_tokens: 1024,
            max_tokens_limit: 8192,
            max_input_chars: 100_000,
            max_system_prompt_chars: 20_000,
            temperature: 0.7,
            strict_temperature: 0.0,
            temperature_range: TemperatureRange::default(),
            models: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Capability link signing settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Hex-encoded signing secret, at least 32 bytes once decoded.
    pub secret: Option<String>,
    /// Lifetime of issued links when the caller names none.
    pub default_ttl_secs: u64,
}

impl std::fmt::Debug for LinksConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinksConfig")
            .field("has_secret", &self.secret.is_some())
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish()
    }
}

impl Serialize for LinksConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LinksConfig", 1)?;
        // secret is intentionally omitted.
        state.serialize_field("default_ttl_secs", &self.default_ttl_secs)?;
        state.end()
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            secret: None,
            default_ttl_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (`trace` through `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Output stream (`stdout` or `stderr`).
    pub target: String,
    /// Prefix each line with a timestamp.
    pub timestamps: bool,
    /// Colorize output.
    pub ansi: bool,
    /// Extra per-target filter directives, e.g. `"hyper=warn"`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}
