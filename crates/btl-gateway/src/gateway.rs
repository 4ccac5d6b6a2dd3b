//! The validated generation protocol.
//!
//! At most two sequential upstream calls per request:
//!
//! 1. The caller's system prompt plus an instruction to emit only the
//!    expected JSON object. A conforming result returns immediately.
//! 2. On a parse or schema failure, a stricter prompt that restates every
//!    field and the reason for rejection, at a reduced temperature.
//!
//! If the second output also fails, the caller's fallback is returned
//! verbatim. Validation failures are never surfaced as errors; only request
//! validation and infrastructure failures are.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::extract::extract_json;
use crate::observer::{Attempt, TracingObserver, ValidationFailure, ValidationObserver};
use crate::provider::{GenerationProvider, ProviderCall, ProviderReply};
use crate::request::{GenerationOutput, GenerationRequest, RequestLimits};
use crate::schema::ResultSchema;
use crate::temperature::CapabilityTable;

/// Tunables for the protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Temperature used when the request names none.
    pub default_temperature: f64,
    /// Temperature requested for the strict retry.
    pub strict_temperature: f64,
    /// Token bound used when the request names none.
    pub default_max_tokens: u32,
    /// Request validation bounds.
    pub limits: RequestLimits,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_temperature: 0.7,
            strict_temperature: 0.0,
            default_max_tokens: 1024,
            limits: RequestLimits::default(),
        }
    }
}

/// A request paired with its result schema and fallback.
///
/// The fallback is checked against the schema at construction, so a
/// fallback result always conforms.
#[derive(Debug, Clone)]
pub struct GenerationSpec {
    request: GenerationRequest,
    schema: ResultSchema,
    fallback: Value,
}

impl GenerationSpec {
    /// Pair a request with a schema and a conforming fallback.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the schema is malformed or the
    /// fallback does not conform to it.
    pub fn new(
        request: GenerationRequest,
        schema: ResultSchema,
        fallback: Value,
    ) -> GatewayResult<Self> {
        schema
            .check_well_formed()
            .map_err(|v| GatewayError::Validation(format!("invalid schema: {v}")))?;
        schema.validate(&fallback).map_err(|v| {
            GatewayError::Validation(format!("fallback does not match schema: {v}"))
        })?;
        Ok(Self {
            request,
            schema,
            fallback,
        })
    }

    /// The underlying request.
    #[must_use]
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// The result schema.
    #[must_use]
    pub fn schema(&self) -> &ResultSchema {
        &self.schema
    }

    /// The fallback value.
    #[must_use]
    pub fn fallback(&self) -> &Value {
        &self.fallback
    }
}

/// Where a validated output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    /// Attempt 1 conformed.
    FirstAttempt,
    /// Attempt 2 conformed.
    StrictRetry,
    /// Neither attempt conformed; the caller's fallback.
    Fallback,
}

/// A schema-conforming result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedOutput {
    /// The conforming value.
    #[serde(rename = "output")]
    pub value: Value,
    /// Which step produced it.
    pub source: OutputSource,
    /// Upstream calls made (1 or 2).
    pub attempts: u32,
    /// Tokens consumed across all attempts, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    /// Model the calls went to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The generation gateway.
///
/// Stateless per call; cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn GenerationProvider>,
    capabilities: Arc<CapabilityTable>,
    observer: Arc<dyn ValidationObserver>,
    config: GatewayConfig,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway with default config, an empty capability table and
    /// the tracing observer.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            capabilities: Arc::new(CapabilityTable::default()),
            observer: Arc::new(TracingObserver),
            config: GatewayConfig::default(),
        }
    }

    /// Set the temperature capability table.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = Arc::new(capabilities);
        self
    }

    /// Set the validation observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ValidationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the protocol config.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// The request limits in force.
    #[must_use]
    pub fn limits(&self) -> &RequestLimits {
        &self.config.limits
    }

    fn model_for<'a>(&'a self, request: &'a GenerationRequest) -> &'a str {
        request
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    fn build_call(
        &self,
        request: &GenerationRequest,
        model: &str,
        system: String,
        temperature: f64,
    ) -> ProviderCall {
        ProviderCall {
            model: model.to_owned(),
            system,
            input: request.input.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: self.capabilities.resolve(model, temperature),
        }
    }

    /// One upstream call with no schema. Returns the raw text.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] for a bad request, otherwise whatever the
    /// provider reports.
    pub async fn generate_raw(
        &self,
        request: &GenerationRequest,
    ) -> GatewayResult<GenerationOutput> {
        request.validate(&self.config.limits)?;
        let model = self.model_for(request);
        let call = self.build_call(
            request,
            model,
            request.system_prompt.clone(),
            request
                .temperature
                .unwrap_or(self.config.default_temperature),
        );

        debug!(provider = self.provider.name(), model, "raw generation");
        let reply = self.provider.complete(&call).await?;
        Ok(GenerationOutput {
            output: reply.text,
            tokens_used: reply.tokens_used,
            model: reply.model.or_else(|| Some(model.to_owned())),
        })
    }

    /// Run the validated protocol for `spec`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] for a bad request, otherwise the
    /// provider's timeout, rate-limit or upstream errors. Unusable output is
    /// never an error.
    pub async fn generate_validated(
        &self,
        spec: &GenerationSpec,
    ) -> GatewayResult<ValidatedOutput> {
        let request = &spec.request;
        request.validate(&self.config.limits)?;
        let model = self.model_for(request);

        // Attempt 1
        let first_call = self.build_call(
            request,
            model,
            first_attempt_prompt(&request.system_prompt, &spec.schema),
            request
                .temperature
                .unwrap_or(self.config.default_temperature),
        );
        let first = self.provider.complete(&first_call).await?;
        let mut tokens_used = first.tokens_used;
        let mut served_by = first.model.clone();

        let reason = match check_output(&first, &spec.schema) {
            Ok(value) => {
                debug!(model, "first attempt conformed");
                return Ok(ValidatedOutput {
                    value,
                    source: OutputSource::FirstAttempt,
                    attempts: 1,
                    tokens_used,
                    model: served_by.or_else(|| Some(model.to_owned())),
                });
            },
            Err(reason) => reason,
        };
        self.observer.on_validation_failure(&ValidationFailure {
            attempt: Attempt::First,
            model,
            reason: &reason,
            raw_output: &first.text,
        });

        // Attempt 2
        let strict_call = self.build_call(
            request,
            model,
            strict_retry_prompt(&request.system_prompt, &spec.schema, &reason),
            self.config.strict_temperature,
        );
        let second = self.provider.complete(&strict_call).await?;
        tokens_used = add_tokens(tokens_used, second.tokens_used);
        if second.model.is_some() {
            served_by.clone_from(&second.model);
        }
        let model_out = served_by.or_else(|| Some(model.to_owned()));

        match check_output(&second, &spec.schema) {
            Ok(value) => {
                debug!(model, "strict retry conformed");
                Ok(ValidatedOutput {
                    value,
                    source: OutputSource::StrictRetry,
                    attempts: 2,
                    tokens_used,
                    model: model_out,
                })
            },
            Err(reason) => {
                self.observer.on_validation_failure(&ValidationFailure {
                    attempt: Attempt::StrictRetry,
                    model,
                    reason: &reason,
                    raw_output: &second.text,
                });
                info!(model, "returning fallback after two unusable outputs");
                Ok(ValidatedOutput {
                    value: spec.fallback.clone(),
                    source: OutputSource::Fallback,
                    attempts: 2,
                    tokens_used,
                    model: model_out,
                })
            },
        }
    }
}

fn add_tokens(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Extract and validate, returning the rejection reason on failure.
fn check_output(reply: &ProviderReply, schema: &ResultSchema) -> Result<Value, String> {
    let value = extract_json(&reply.text).ok_or_else(|| "output contained no JSON".to_string())?;
    schema.validate(&value).map_err(|v| v.to_string())?;
    Ok(value)
}

fn first_attempt_prompt(system_prompt: &str, schema: &ResultSchema) -> String {
    let mut prompt = String::with_capacity(system_prompt.len().saturating_add(256));
    if !system_prompt.is_empty() {
        prompt.push_str(system_prompt);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Respond with only a single JSON object and no other text. \
         The object has these fields:\n",
    );
    prompt.push_str(&schema.describe());
    prompt
}

fn strict_retry_prompt(system_prompt: &str, schema: &ResultSchema, reason: &str) -> String {
    let mut prompt = String::with_capacity(system_prompt.len().saturating_add(512));
    if !system_prompt.is_empty() {
        prompt.push_str(system_prompt);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Your previous response was rejected: ");
    prompt.push_str(reason);
    prompt.push_str(
        ".\n\nReturn ONLY a raw JSON object. Do not use code fences. Do not add any \
         explanation before or after it. Every required field must be present with \
         exactly the stated type, and enum fields must use one of the listed values \
         verbatim:\n",
    );
    prompt.push_str(&schema.describe());
    prompt
}
