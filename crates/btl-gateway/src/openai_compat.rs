//! OpenAI-compatible chat completions provider.
//!
//! Works with:
//! - `OpenAI` API
//! - vLLM
//! - Ollama (with `OpenAI` compatibility)
//! - Any `OpenAI`-compatible endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::{Host, Url};

use crate::error::{GatewayError, GatewayResult};
use crate::provider::{
    GenerationProvider, ProviderCall, ProviderConfig, ProviderReply, error_for_status,
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible provider.
pub struct OpenAiCompatProvider {
    client: Client,
    config: ProviderConfig,
    base_url: String,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("config", &self.config)
            .field("local", &is_local_url(&self.base_url))
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider. Without a base URL the public `OpenAI` endpoint is used.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> GatewayResult<Self> {
        let client = config.build_client()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a provider on a caller-supplied client.
    #[must_use]
    pub fn with_client(client: Client, config: ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
        Self {
            client,
            config,
            base_url,
        }
    }

    /// Build the request body.
    fn build_request(call: &ProviderCall) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !call.system.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": call.system
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": call.input
        }));

        let mut request = serde_json::json!({
            "model": call.model,
            "messages": messages,
            "max_tokens": call.max_tokens,
            "stream": false,
        });
        if let Some(temperature) = call.temperature {
            request["temperature"] = Value::from(temperature);
        }
        request
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, call: &ProviderCall) -> GatewayResult<ProviderReply> {
        if self.config.api_key.is_empty() && !is_local_url(&self.base_url) {
            return Err(GatewayError::Config(
                "API key not configured for openai-compat".into(),
            ));
        }

        let request_body = Self::build_request(call);

        debug!(
            model = %call.model,
            base_url = %self.base_url,
            "Making OpenAI-compatible completion request"
        );

        let mut request = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json");

        if !self.config.api_key.is_empty() {
            let mut auth_value = reqwest::header::HeaderValue::try_from(format!(
                "Bearer {}",
                self.config.api_key
            ))
            .map_err(|e| GatewayError::Config(format!("Invalid API key characters: {e}")))?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(&request_body)
            .send()
            .await
            .map_err(|ref e| GatewayError::from_reqwest(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.name(), response).await);
        }

        let response: OpenAiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(e.to_string())
            } else {
                GatewayError::Upstream(format!("invalid completion response: {e}"))
            }
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Upstream("No choices in response".to_string()))?;

        Ok(ProviderReply {
            text: choice.message.content.unwrap_or_default(),
            tokens_used: response.usage.map(|u| {
                u.total_tokens
                    .unwrap_or_else(|| u.prompt_tokens.saturating_add(u.completion_tokens))
            }),
            model: response.model,
        })
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

/// Whether `url`'s host is a loopback address, where an API key is usually
/// not required. Only the parsed host counts; paths and queries are ignored.
fn is_local_url(url: &str) -> bool {
    match Url::parse(url).ok().as_ref().and_then(Url::host) {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn call() -> ProviderCall {
        ProviderCall {
            model: "gpt-4o-mini".into(),
            system: "sys".into(),
            input: "hi".into(),
            max_tokens: 64,
            temperature: None,
        }
    }

    #[test]
    fn test_default_url() {
        let provider =
            OpenAiCompatProvider::new(ProviderConfig::new("sk-test", "gpt-4o")).unwrap();
        assert!(provider.base_url.contains("api.openai.com"));
        assert_eq!(provider.default_model(), "gpt-4o");
    }

    #[test]
    fn test_build_request() {
        let request = OpenAiCompatProvider::build_request(&call());
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "hi");
        assert!(request.get("temperature").is_none());
    }

    #[test]
    fn test_is_local_url() {
        assert!(is_local_url("http://localhost:1234/v1/chat/completions"));
        assert!(is_local_url("http://127.0.0.1:8000"));
        assert!(is_local_url("http://[::1]:8080/v1"));
        assert!(is_local_url("http://LOCALHOST/v1"));
        assert!(!is_local_url("https://api.openai.com/v1/chat/completions"));
        assert!(!is_local_url("https://api.example.com/?x=localhost"));
        assert!(!is_local_url("https://localhost.example.com/v1"));
        assert!(!is_local_url("https://127.0.0.1.example.com/v1"));
        assert!(!is_local_url("not a url"));
    }

    #[tokio::test]
    async fn test_remote_requires_key() {
        let provider = OpenAiCompatProvider::new(ProviderConfig::new("", "gpt-4o")).unwrap();
        assert!(matches!(
            provider.complete(&call()).await,
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_localhost_in_query_still_requires_key() {
        let provider = OpenAiCompatProvider::new(
            ProviderConfig::new("", "gpt-4o").base_url("https://api.example.com/?x=localhost"),
        )
        .unwrap();
        assert!(matches!(
            provider.complete(&call()).await,
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_against_local_server_without_key() {
        // MockServer binds 127.0.0.1, so no key is required.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{
                    "message": {"role": "assistant", "content": "ok"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new(
            ProviderConfig::new("", "gpt-4o-mini")
                .base_url(format!("{}/v1/chat/completions", server.uri()))
                .timeout(Duration::from_secs(5)),
        )
        .unwrap();
        let reply = provider.complete(&call()).await.unwrap();
        assert_eq!(reply.text, "ok");
        assert_eq!(reply.tokens_used, Some(4));
        assert_eq!(reply.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[tokio::test]
    async fn test_bearer_header_and_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new(
            ProviderConfig::new("sk-test", "gpt-4o-mini").base_url(server.uri()),
        )
        .unwrap();
        assert!(matches!(
            provider.complete(&call()).await,
            Err(GatewayError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_timeout_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let provider =
            OpenAiCompatProvider::new(ProviderConfig::new("", "m").base_url(server.uri())).unwrap();
        assert!(matches!(
            provider.complete(&call()).await,
            Err(GatewayError::Timeout(_))
        ));
    }
}
