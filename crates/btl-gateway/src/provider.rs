//! Generation provider trait.
//!
//! Defines the interface that all upstream text generators implement, plus
//! the HTTP plumbing the bundled providers share.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::error;

use crate::error::{GatewayError, GatewayResult};

/// One upstream call, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    /// Model identifier.
    pub model: String,
    /// System prompt, possibly empty.
    pub system: String,
    /// User input.
    pub input: String,
    /// Token bound.
    pub max_tokens: u32,
    /// Temperature to send, or `None` to omit the parameter.
    pub temperature: Option<f64>,
}

/// What the provider returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    /// Generated text.
    pub text: String,
    /// Tokens consumed, if reported.
    pub tokens_used: Option<u64>,
    /// Model that served the call, if reported.
    pub model: Option<String>,
}

/// Upstream text generator.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Model used when a request names none.
    fn default_model(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, call: &ProviderCall) -> GatewayResult<ProviderReply>;
}

/// Connection settings for an HTTP provider.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key.
    pub api_key: String,
    /// Default model.
    pub model: String,
    /// Endpoint override.
    pub base_url: Option<String>,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("has_base_url", &self.base_url.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a config with API key and model, and a 60 second timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn build_client(&self) -> GatewayResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
    }
}

/// Turn a non-success response into the matching error.
pub(crate) async fn error_for_status(provider: &str, response: Response) -> GatewayError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    error!(provider, status = %status, body = %body, "provider API error");

    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited { retry_after_secs },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GatewayError::Timeout(format!("{provider} returned {status}"))
        },
        _ => GatewayError::Upstream(format!("{provider} returned {status}: {body}")),
    }
}
