//! Integration tests for the retry-then-fallback generation protocol.

use std::sync::Arc;

use serde_json::json;

use btl_gateway::{
    CapabilityTable, Gateway, GatewayConfig, GatewayError, OutputSource, TemperaturePolicy,
};
use btl_test::prelude::*;

fn gateway(provider: &Arc<ScriptedProvider>) -> Gateway {
    Gateway::new(provider.clone())
}

#[tokio::test]
async fn test_valid_first_attempt_makes_one_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::json(&title_output())]));
    let out = gateway(&provider)
        .generate_validated(&title_spec().unwrap())
        .await
        .unwrap();

    assert_eq!(out.value, title_output());
    assert_eq!(out.source, OutputSource::FirstAttempt);
    assert_eq!(out.attempts, 1);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_both_attempts_invalid_returns_exact_fallback() {
    init_test_tracing();
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::text("Sure! Here is a title: The Harbour"),
        ScriptedTurn::json(&json!({"title": "The Harbour", "mood": "furious"})),
    ]));
    let out = gateway(&provider)
        .generate_validated(&title_spec().unwrap())
        .await
        .unwrap();

    assert_eq!(out.value, title_fallback());
    assert_eq!(out.source, OutputSource::Fallback);
    assert_eq!(out.attempts, 2);
    assert_eq!(provider.call_count(), 2);
    assert_eq!(provider.remaining(), 0);
}

#[tokio::test]
async fn test_strict_retry_recovers() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::json(&json!({"title": "No mood"})),
        ScriptedTurn::text(format!("```json\n{}\n```", title_output())),
    ]));
    let out = gateway(&provider)
        .generate_validated(&title_spec().unwrap())
        .await
        .unwrap();

    assert_eq!(out.value, title_output());
    assert_eq!(out.source, OutputSource::StrictRetry);
    assert_eq!(out.tokens_used, Some(20));

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].system, calls[1].system);
    assert_eq!(calls[0].input, calls[1].input);
}

#[tokio::test]
async fn test_strict_retry_uses_strict_temperature_within_capability() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![ScriptedTurn::text("x"), ScriptedTurn::text("y")])
            .with_model("tuned"),
    );
    let gateway = Gateway::new(provider.clone())
        .with_capabilities(CapabilityTable::new((0.2, 1.0)))
        .with_config(GatewayConfig {
            default_temperature: 0.7,
            strict_temperature: 0.0,
            ..GatewayConfig::default()
        });

    gateway
        .generate_validated(&title_spec().unwrap())
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls[0].temperature, Some(0.7));
    // Clamped to the model's lower bound.
    assert_eq!(calls[1].temperature, Some(0.2));
}

#[tokio::test]
async fn test_fixed_and_omitted_temperatures() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::text("a"),
        ScriptedTurn::text("b"),
    ]));
    let gateway = Gateway::new(provider.clone()).with_capabilities(
        CapabilityTable::default()
            .with_model("reasoner", TemperaturePolicy::Fixed { value: 1.0 })
            .with_model("mute", TemperaturePolicy::Omit),
    );

    gateway
        .generate_raw(&test_request().with_model("reasoner").with_temperature(0.1))
        .await
        .unwrap();
    gateway
        .generate_raw(&test_request().with_model("mute").with_temperature(0.1))
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls[0].temperature, Some(1.0));
    assert_eq!(calls[1].temperature, None);
}

#[tokio::test]
async fn test_upstream_failure_is_not_absorbed() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::text("not json"),
        ScriptedTurn::Timeout,
    ]));
    let err = gateway(&provider)
        .generate_validated(&title_spec().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)));
}

#[tokio::test]
async fn test_invalid_request_never_calls_upstream() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::text("x")]));
    let err = gateway(&provider)
        .generate_raw(&test_request().with_max_tokens(0))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(_)));
    assert_eq!(provider.call_count(), 0);
}
