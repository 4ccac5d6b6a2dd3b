//! End-to-end tests: configuration through the bridge to the HTTP router,
//! with a mocked upstream model.

use std::collections::HashMap;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use btl_config::loader::load_with;
use btl_server::{bridge, cors_layer, create_router};

fn claude_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "claude-sonnet-4-20250514",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 12, "output_tokens": 8}
    }))
}

/// Load config from a temp `btl.toml` pointing at `upstream`, then build the
/// router exactly as `btld serve` does.
fn app_for(upstream: &MockServer, extra_toml: &str) -> Router {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("btl.toml"),
        format!(
            r#"
[server]
cors_origins = ["https://app.example"]

[store]
max_payload_bytes = 512

[model]
provider = "claude"
api_url = "{}/v1/messages"
timeout_secs = 5
{extra_toml}
"#,
            upstream.uri()
        ),
    )
    .unwrap();

    let env = HashMap::from([("ANTHROPIC_API_KEY".to_string(), "test-key".to_string())]);
    let resolved = load_with(None, dir.path(), None, &env).unwrap();
    assert!(resolved.loaded_file.is_some());

    let config = resolved.config;
    let state = bridge::build_state(&config).unwrap();
    create_router(state, cors_layer(&config.server.cors_origins))
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_key_store_over_http() {
    let upstream = MockServer::start().await;
    let app = app_for(&upstream, "");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/kv/note:1", &json!({"text": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/kv/note:1", &json!({"text": "again"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/kv/note:1", &json!({"pinned": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/kv/note:1"))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"text": "hi", "pinned": true})
    );

    // The configured cap applies to the raw body.
    let big = json!({"text": "x".repeat(1024)});
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/kv/note:2", &big))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app
        .oneshot(empty_request("GET", "/kv/note:2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_validated_generation_retries_against_upstream() {
    btl_test::init_test_tracing();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header_matcher("x-api-key", "test-key"))
        .respond_with(claude_reply("I think the title is The Harbour."))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(claude_reply(r#"{"title": "The Harbour"}"#))
        .with_priority(2)
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_for(&upstream, "");
    let response = app
        .oneshot(json_request(
            "POST",
            "/generate/validated",
            &json!({
                "systemPrompt": "Name the chapter.",
                "input": "The crew reaches the harbour at dawn.",
                "schema": {"fields": {"title": {"type": "string"}}},
                "fallback": {"title": "Untitled"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["output"], json!({"title": "The Harbour"}));
    assert_eq!(body["source"], "strict_retry");
    assert_eq!(body["attempts"], 2);
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
}

#[tokio::test]
async fn test_fixed_temperature_model_from_config() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(claude_reply("hello"))
        .mount(&upstream)
        .await;

    let app = app_for(
        &upstream,
        r#"
[model.models."fixed-model"]
policy = "fixed"
value = 1.0
"#,
    );
    let response = app
        .oneshot(json_request(
            "POST",
            "/generate",
            &json!({"input": "hi", "model": "fixed-model", "temperature": 0.2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["output"], "hello");

    let requests = upstream.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["model"], "fixed-model");
    assert_eq!(sent["temperature"], 1.0);
}

#[tokio::test]
async fn test_upstream_outage_maps_to_503() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&upstream)
        .await;

    let app = app_for(&upstream, "");
    let response = app
        .oneshot(json_request("POST", "/generate", &json!({"input": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_rate_limit_passes_retry_after() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&upstream)
        .await;

    let app = app_for(&upstream, "");
    let response = app
        .oneshot(json_request("POST", "/generate", &json!({"input": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "30");
}
