//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use std::net::SocketAddr;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, ModelCapability, StoreBackend};

/// Providers the server knows how to construct.
pub const SUPPORTED_PROVIDERS: &[&str] = &["claude", "openai", "openai-compat"];

/// Upper bound on any temperature value.
const MAX_TEMPERATURE: f64 = 2.0;

/// Minimum link secret length, in decoded bytes.
const MIN_SECRET_BYTES: usize = 32;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_store(config)?;
    validate_model(config)?;
    validate_links(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let s = &config.server;

    if s.listen_addr.parse::<SocketAddr>().is_err() {
        return Err(invalid(
            "server.listen_addr",
            format!("'{}' is not a socket address", s.listen_addr),
        ));
    }

    for origin in &s.cors_origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://"))
            || origin.ends_with('/')
        {
            return Err(invalid(
                "server.cors_origins",
                format!("'{origin}' must be a scheme://host[:port] origin without a trailing slash"),
            ));
        }
    }

    Ok(())
}

fn validate_store(config: &Config) -> ConfigResult<()> {
    let s = &config.store;

    if s.max_payload_bytes == 0 {
        return Err(invalid(
            "store.max_payload_bytes",
            "max_payload_bytes must be greater than 0",
        ));
    }

    if s.backend == StoreBackend::Surrealkv && s.path.as_deref().is_none_or(str::is_empty) {
        return Err(invalid(
            "store.path",
            "the surrealkv backend requires a data path",
        ));
    }

    Ok(())
}

fn check_temperature(field: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&value) {
        return Err(invalid(
            field,
            format!("temperature {value} is out of range; must be between 0.0 and {MAX_TEMPERATURE}"),
        ));
    }
    Ok(())
}

fn check_range(field: &str, min: f64, max: f64) -> ConfigResult<()> {
    check_temperature(field, min)?;
    check_temperature(field, max)?;
    if min > max {
        return Err(invalid(field, format!("min {min} is greater than max {max}")));
    }
    Ok(())
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    let m = &config.model;

    if !SUPPORTED_PROVIDERS.contains(&m.provider.as_str()) {
        return Err(invalid(
            "model.provider",
            format!(
                "unsupported provider '{}'; expected one of: {}",
                m.provider,
                SUPPORTED_PROVIDERS.join(", ")
            ),
        ));
    }

    if m.model.trim().is_empty() {
        return Err(invalid("model.model", "model must not be empty"));
    }

    if m.timeout_secs == 0 {
        return Err(invalid(
            "model.timeout_secs",
            "timeout_secs must be greater than 0",
        ));
    }

    if m.max_tokens_limit == 0 {
        return Err(invalid(
            "model.max_tokens_limit",
            "max_tokens_limit must be greater than 0",
        ));
    }

    if m.max_tokens == 0 || m.max_tokens > m.max_tokens_limit {
        return Err(invalid(
            "model.max_tokens",
            format!("max_tokens must be between 1 and {}", m.max_tokens_limit),
        ));
    }

    if m.max_input_chars == 0 {
        return Err(invalid(
            "model.max_input_chars",
            "max_input_chars must be greater than 0",
        ));
    }

    check_temperature("model.temperature", m.temperature)?;
    check_temperature("model.strict_temperature", m.strict_temperature)?;
    check_range(
        "model.temperature_range",
        m.temperature_range.min,
        m.temperature_range.max,
    )?;

    for (name, capability) in &m.models {
        let field = format!("model.models.{name}");
        match *capability {
            ModelCapability::Adjustable { min, max } => check_range(&field, min, max)?,
            ModelCapability::Fixed { value } => check_temperature(&field, value)?,
            ModelCapability::Omit => {},
        }
    }

    Ok(())
}

fn validate_links(config: &Config) -> ConfigResult<()> {
    let l = &config.links;

    if l.default_ttl_secs == 0 {
        return Err(invalid(
            "links.default_ttl_secs",
            "default_ttl_secs must be at least 1",
        ));
    }

    if let Some(secret) = &l.secret {
        // The value itself is never echoed back.
        if !secret.len().is_multiple_of(2) || !secret.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("links.secret", "secret must be hex-encoded"));
        }
        if secret.len() / 2 < MIN_SECRET_BYTES {
            return Err(invalid(
                "links.secret",
                format!("secret must decode to at least {MIN_SECRET_BYTES} bytes"),
            ));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown log level '{}'; expected trace, debug, info, warn or error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown log format '{}'; expected pretty, compact, json or full",
                l.format
            ),
        ));
    }

    if !matches!(l.target.as_str(), "stdout" | "stderr") {
        return Err(invalid(
            "logging.target",
            format!("unknown log target '{}'; expected stdout or stderr", l.target),
        ));
    }

    Ok(())
}
