//! Claude (Anthropic Messages API) provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::provider::{
    GenerationProvider, ProviderCall, ProviderConfig, ProviderReply, error_for_status,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude provider.
pub struct ClaudeProvider {
    client: Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClaudeProvider {
    /// Create a provider with its own HTTP client honouring the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> GatewayResult<Self> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// Create a provider on a caller-supplied client.
    #[must_use]
    pub fn with_client(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// Build the API request body.
    fn build_request(call: &ProviderCall) -> Value {
        let mut request = serde_json::json!({
            "model": call.model,
            "max_tokens": call.max_tokens,
            "messages": [{"role": "user", "content": call.input}],
        });

        if !call.system.is_empty() {
            request["system"] = Value::String(call.system.clone());
        }
        if let Some(temperature) = call.temperature {
            request["temperature"] = Value::from(temperature);
        }

        request
    }

    fn parse_response(response: ApiResponse) -> ProviderReply {
        let text = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<String>();

        ProviderReply {
            text,
            tokens_used: Some(
                response
                    .usage
                    .input_tokens
                    .saturating_add(response.usage.output_tokens),
            ),
            model: response.model,
        }
    }
}

#[async_trait]
impl GenerationProvider for ClaudeProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "claude"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, call: &ProviderCall) -> GatewayResult<ProviderReply> {
        if self.config.api_key.is_empty() {
            return Err(GatewayError::Config(
                "API key not configured for claude".into(),
            ));
        }

        let request_body = Self::build_request(call);
        let url = self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL);

        debug!(model = %call.model, "Sending Claude request");

        let mut api_key_header = reqwest::header::HeaderValue::try_from(&self.config.api_key)
            .map_err(|e| GatewayError::Config(format!("Invalid API key characters: {e}")))?;
        api_key_header.set_sensitive(true);

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key_header)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|ref e| GatewayError::from_reqwest(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.name(), response).await);
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(e.to_string())
            } else {
                GatewayError::Upstream(format!("invalid Claude response: {e}"))
            }
        })?;

        Ok(Self::parse_response(api_response))
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
