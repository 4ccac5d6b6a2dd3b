//! Bridge from `btl_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This
//! module translates its types into the store, gateway, links and
//! telemetry types, so conversion happens exactly once, in one place.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::warn;

use btl_config::{
    Config, LinksConfig, LoggingConfig, ModelCapability, ModelConfig, StoreBackend, StoreConfig,
};
use btl_crypto::LinkSecret;
use btl_gateway::{
    CapabilityTable, ClaudeProvider, Gateway, GatewayConfig, GenerationProvider,
    OpenAiCompatProvider, ProviderConfig, RequestLimits, TemperaturePolicy,
};
use btl_store::{KeyStore, KvBackend, MemoryBackend, StoreLimits};
use btl_telemetry::{LogConfig, LogFormat, LogTarget};

use crate::state::AppState;

/// Longest model identifier a caller may name.
const MAX_MODEL_LEN: usize = 128;

/// Convert config to [`LogConfig`].
///
/// An unrecognised format or target falls back to the default; the loader
/// validates both before this point.
#[must_use]
pub fn to_log_config(cfg: &LoggingConfig) -> LogConfig {
    let format = LogFormat::from_str(&cfg.format).unwrap_or_default();
    let target = match cfg.target.as_str() {
        "stdout" => LogTarget::Stdout,
        _ => LogTarget::Stderr,
    };
    let mut log = LogConfig::new(cfg.level.to_lowercase())
        .with_format(format)
        .with_target(target)
        .with_directives(cfg.directives.iter().cloned());
    if !cfg.timestamps {
        log = log.without_timestamps();
    }
    if !cfg.ansi {
        log = log.without_ansi();
    }
    log
}

/// Convert config to [`StoreLimits`].
#[must_use]
pub fn to_store_limits(cfg: &StoreConfig) -> StoreLimits {
    StoreLimits {
        max_payload_bytes: cfg.max_payload_bytes,
    }
}

/// Open the configured key store backend.
///
/// # Errors
///
/// Fails if the durable backend cannot be opened, or was requested from a
/// build without it.
pub fn build_backend(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    match cfg.backend {
        StoreBackend::Memory => {
            warn!("using the in-memory key store; records are lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        },
        StoreBackend::Surrealkv => open_surrealkv(cfg),
    }
}

#[cfg(feature = "surrealkv")]
fn open_surrealkv(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    let Some(path) = cfg.path.as_deref() else {
        bail!("store.path is required for the surrealkv backend");
    };
    let backend = btl_store::SurrealKvBackend::open(path)
        .with_context(|| format!("failed to open key store at {path}"))?;
    tracing::info!(path, "opened surrealkv key store");
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "surrealkv"))]
fn open_surrealkv(_cfg: &StoreConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    bail!("this build of btld was compiled without the surrealkv backend")
}

/// Convert config to [`RequestLimits`].
#[must_use]
pub fn to_request_limits(cfg: &ModelConfig) -> RequestLimits {
    RequestLimits {
        max_input_chars: cfg.max_input_chars,
        max_system_prompt_chars: cfg.max_system_prompt_chars,
        max_tokens_limit: cfg.max_tokens_limit,
        max_model_len: MAX_MODEL_LEN,
    }
}

/// Convert config to [`GatewayConfig`].
#[must_use]
pub fn to_gateway_config(cfg: &ModelConfig) -> GatewayConfig {
    GatewayConfig {
        default_temperature: cfg.temperature,
        strict_temperature: cfg.strict_temperature,
        default_max_tokens: cfg.max_tokens,
        limits: to_request_limits(cfg),
    }
}

fn to_policy(capability: ModelCapability) -> TemperaturePolicy {
    match capability {
        ModelCapability::Adjustable { min, max } => TemperaturePolicy::Adjustable { min, max },
        ModelCapability::Fixed { value } => TemperaturePolicy::Fixed { value },
        ModelCapability::Omit => TemperaturePolicy::Omit,
    }
}

/// Convert the `[model.models]` table to a [`CapabilityTable`].
#[must_use]
pub fn to_capability_table(cfg: &ModelConfig) -> CapabilityTable {
    CapabilityTable::new((cfg.temperature_range.min, cfg.temperature_range.max)).with_models(
        cfg.models
            .iter()
            .map(|(model, capability)| (model.clone(), to_policy(*capability))),
    )
}

/// Convert config to [`ProviderConfig`].
///
/// A missing API key yields an empty key; the provider reports a
/// configuration error on the first call.
#[must_use]
pub fn to_provider_config(cfg: &ModelConfig) -> ProviderConfig {
    let api_key = cfg.api_key.clone().unwrap_or_default();
    let mut provider = ProviderConfig::new(api_key, &cfg.model)
        .timeout(Duration::from_secs(cfg.timeout_secs));
    if let Some(url) = &cfg.api_url {
        provider = provider.base_url(url);
    }
    provider
}

/// Build the configured upstream provider.
///
/// # Errors
///
/// Fails for an unknown provider name or if the HTTP client cannot be built.
pub fn build_provider(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    if cfg.api_key.is_none() {
        warn!(
            provider = %cfg.provider,
            "no model API key configured; generation calls will fail until one is set"
        );
    }
    let provider_config = to_provider_config(cfg);
    let provider: Arc<dyn GenerationProvider> = match cfg.provider.as_str() {
        "claude" => Arc::new(ClaudeProvider::new(provider_config)?),
        "openai" | "openai-compat" => Arc::new(OpenAiCompatProvider::new(provider_config)?),
        other => bail!("unsupported model provider: {other}"),
    };
    Ok(provider)
}

/// Decode the configured link secret.
///
/// Returns `Ok(None)` when no secret is configured.
///
/// # Errors
///
/// Fails if the secret is not valid hex or is too short.
pub fn link_secret(cfg: &LinksConfig) -> anyhow::Result<Option<LinkSecret>> {
    cfg.secret
        .as_deref()
        .map(|hex| LinkSecret::from_hex(hex).context("invalid links.secret"))
        .transpose()
}

/// Build the shared application state from config.
///
/// # Errors
///
/// Fails if the key store backend or the provider cannot be built.
pub fn build_state(cfg: &Config) -> anyhow::Result<AppState> {
    let store = KeyStore::with_limits(build_backend(&cfg.store)?, to_store_limits(&cfg.store));
    let gateway = Gateway::new(build_provider(&cfg.model)?)
        .with_capabilities(to_capability_table(&cfg.model))
        .with_config(to_gateway_config(&cfg.model));
    Ok(AppState::new(store, gateway))
}

#[cfg(test)]
mod tests {
    use super::*;
    use btl_config::TemperatureRange;
    use btl_test::fixtures::TEST_SECRET_HEX;

    #[test]
    fn test_log_config() {
        let cfg = LoggingConfig {
            level: "DEBUG".into(),
            format: "json".into(),
            directives: vec!["hyper=warn".into()],
            ..LoggingConfig::default()
        };
        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.target, LogTarget::Stderr);
        assert!(log.timestamps);
        assert!(log.ansi);
        assert_eq!(log.directives, vec!["hyper=warn".to_string()]);
    }

    #[test]
    fn test_log_config_output_options() {
        let cfg = LoggingConfig {
            target: "stdout".into(),
            timestamps: false,
            ansi: false,
            ..LoggingConfig::default()
        };
        let log = to_log_config(&cfg);
        assert_eq!(log.target, LogTarget::Stdout);
        assert!(!log.timestamps);
        assert!(!log.ansi);
    }

    #[test]
    fn test_gateway_config_and_limits() {
        let model = ModelConfig {
            max_tokens: 256,
            max_tokens_limit: 512,
            max_input_chars: 10,
            temperature: 0.3,
            strict_temperature: 0.1,
            ..ModelConfig::default()
        };
        let gateway = to_gateway_config(&model);
        assert_eq!(gateway.default_max_tokens, 256);
        assert!((gateway.default_temperature - 0.3).abs() < f64::EPSILON);
        assert!((gateway.strict_temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(gateway.limits.max_tokens_limit, 512);
        assert_eq!(gateway.limits.max_input_chars, 10);
        assert_eq!(gateway.limits.max_model_len, MAX_MODEL_LEN);
    }

    #[test]
    fn test_capability_table() {
        let mut model = ModelConfig {
            temperature_range: TemperatureRange { min: 0.0, max: 0.5 },
            ..ModelConfig::default()
        };
        model
            .models
            .insert("reasoner".into(), ModelCapability::Fixed { value: 1.0 });
        model.models.insert("mute".into(), ModelCapability::Omit);

        let table = to_capability_table(&model);
        assert_eq!(table.resolve("reasoner", 0.2), Some(1.0));
        assert_eq!(table.resolve("mute", 0.2), None);
        assert_eq!(table.resolve("other", 0.9), Some(0.5));
    }

    #[test]
    fn test_provider_config() {
        let model = ModelConfig {
            api_key: Some("sk-test".into()),
            api_url: Some("http://localhost:11434/v1".into()),
            timeout_secs: 5,
            ..ModelConfig::default()
        };
        let provider = to_provider_config(&model);
        assert_eq!(provider.api_key, "sk-test");
        assert_eq!(
            provider.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(provider.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_build_provider_rejects_unknown() {
        let model = ModelConfig {
            provider: "carrier-pigeon".into(),
            ..ModelConfig::default()
        };
        assert!(build_provider(&model).is_err());
    }

    #[test]
    fn test_link_secret() {
        assert!(link_secret(&LinksConfig::default()).unwrap().is_none());

        let cfg = LinksConfig {
            secret: Some(TEST_SECRET_HEX.into()),
            ..LinksConfig::default()
        };
        assert!(link_secret(&cfg).unwrap().is_some());

        let bad = LinksConfig {
            secret: Some("zz".into()),
            ..LinksConfig::default()
        };
        assert!(link_secret(&bad).is_err());
    }

    #[tokio::test]
    async fn test_build_state_from_defaults() {
        let state = build_state(&Config::default()).unwrap();
        assert_eq!(state.max_payload_bytes(), 262_144);
        state
            .store
            .put("k", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(state.store.get("k").await.unwrap().value["a"], 1);
    }

    #[test]
    fn test_surrealkv_requires_path() {
        let cfg = StoreConfig {
            backend: StoreBackend::Surrealkv,
            path: None,
            ..StoreConfig::default()
        };
        assert!(build_backend(&cfg).is_err());
    }

    #[cfg(feature = "surrealkv")]
    #[tokio::test]
    async fn test_surrealkv_opens_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig {
            backend: StoreBackend::Surrealkv,
            path: Some(dir.path().join("kv").to_string_lossy().into_owned()),
            ..StoreConfig::default()
        };
        assert!(build_backend(&cfg).is_ok());
    }
}
