//! Generation request and raw output types.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Bounds applied by [`GenerationRequest::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    /// Maximum `input` length in characters.
    pub max_input_chars: usize,
    /// Maximum `systemPrompt` length in characters.
    pub max_system_prompt_chars: usize,
    /// Largest `maxTokens` a caller may ask for.
    pub max_tokens_limit: u32,
    /// Maximum `model` identifier length.
    pub max_model_len: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_input_chars: 100_000,
            max_system_prompt_chars: 20_000,
            max_tokens_limit: 8_192,
            max_model_len: 128,
        }
    }
}

/// A caller's generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Instructions for the model.
    #[serde(default)]
    pub system_prompt: String,
    /// The user-supplied input text.
    pub input: String,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Requested sampling temperature. Subject to the model's capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Model identifier. The provider default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerationRequest {
    /// Create a request with the given system prompt and input.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    /// Set the token bound.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the requested temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check the request against `limits`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] describing the first violation.
    pub fn validate(&self, limits: &RequestLimits) -> GatewayResult<()> {
        if self.input.trim().is_empty() {
            return Err(GatewayError::Validation("input must not be empty".into()));
        }
        let input_chars = self.input.chars().count();
        if input_chars > limits.max_input_chars {
            return Err(GatewayError::Validation(format!(
                "input is {input_chars} characters, limit is {}",
                limits.max_input_chars
            )));
        }
        let prompt_chars = self.system_prompt.chars().count();
        if prompt_chars > limits.max_system_prompt_chars {
            return Err(GatewayError::Validation(format!(
                "systemPrompt is {prompt_chars} characters, limit is {}",
                limits.max_system_prompt_chars
            )));
        }
        if let Some(max_tokens) = self.max_tokens
            && !(1..=limits.max_tokens_limit).contains(&max_tokens)
        {
            return Err(GatewayError::Validation(format!(
                "maxTokens must be between 1 and {}, got {max_tokens}",
                limits.max_tokens_limit
            )));
        }
        if let Some(temperature) = self.temperature
            && !temperature.is_finite()
        {
            return Err(GatewayError::Validation(
                "temperature must be a finite number".into(),
            ));
        }
        if let Some(model) = &self.model
            && (model.trim().is_empty() || model.len() > limits.max_model_len)
        {
            return Err(GatewayError::Validation(format!(
                "model must be 1 to {} characters",
                limits.max_model_len
            )));
        }
        Ok(())
    }
}

/// Raw output of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    /// Generated text, unprocessed.
    pub output: String,
    /// Tokens consumed, when the provider reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    /// Model that served the call, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}
