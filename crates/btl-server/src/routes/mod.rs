//! API router configuration.

mod generate;
mod kv;
mod system;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body cap for the generation endpoints.
pub const GENERATE_BODY_LIMIT: usize = 1_048_576;

/// Endpoints listed by `GET /`.
pub const ENDPOINTS: &[&str] = &[
    "/health",
    "/api/health",
    "/kv/{key}",
    "/generate",
    "/generate/validated",
];

/// Create the main API router.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let kv_routes = Router::new()
        .route(
            "/kv/*key",
            get(kv::get_value)
                .put(kv::put_value)
                .post(kv::create_value)
                .patch(kv::patch_value)
                .delete(kv::delete_value),
        )
        .layer(DefaultBodyLimit::max(state.max_payload_bytes()));

    let generate_routes = Router::new()
        .route("/generate", post(generate::generate))
        .route("/generate/validated", post(generate::generate_validated))
        .layer(DefaultBodyLimit::max(GENERATE_BODY_LIMIT));

    Router::new()
        .route("/", get(system::root))
        .route("/api", get(system::root))
        .route("/health", get(system::health_check))
        .route("/api/health", get(system::health_check))
        .merge(kv_routes)
        .merge(generate_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS restricted to `origins`. An empty list allows no cross-origin access.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin = %origin, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

/// Check a buffered body against `limit` and decode it as JSON.
fn decode_body<T: DeserializeOwned>(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> ApiResult<T> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::Validation(rejection.body_text())
        }
    })?;
    if bytes.len() > limit {
        return Err(ApiError::PayloadTooLarge { limit });
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use btl_gateway::Gateway;
    use btl_store::{KeyStore, MemoryBackend, StoreLimits};
    use btl_test::{ScriptedProvider, ScriptedTurn};

    use super::*;

    fn app_with(provider: Arc<ScriptedProvider>, max_payload_bytes: usize) -> Router {
        let store = KeyStore::with_limits(
            Arc::new(MemoryBackend::new()),
            StoreLimits { max_payload_bytes },
        );
        let state = AppState::new(store, Gateway::new(provider));
        create_router(state, cors_layer(&["https://app.example".to_string()]))
    }

    fn app() -> Router {
        app_with(Arc::new(ScriptedProvider::new(vec![])), 1024)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let app = app();
        for path in ["/health", "/api/health"] {
            let response = app.clone().oneshot(request("GET", path, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_of(response).await;
            assert_eq!(body["success"], true);
            assert_eq!(body["data"]["status"], "healthy");
            assert!(body["data"]["uptime_secs"].is_u64());
        }

        for path in ["/", "/api"] {
            let response = app.clone().oneshot(request("GET", path, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_of(response).await;
            assert_eq!(body["data"]["name"], "btl");
            assert!(body["data"]["endpoints"].as_array().unwrap().len() >= 4);
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app().oneshot(request("GET", "/nope", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_of(response).await;
        assert_eq!(body["error"], "NOT_FOUND");
        assert!(body["message"].as_str().unwrap().contains("/nope"));
    }

    #[tokio::test]
    async fn test_kv_lifecycle() {
        let app = app();

        let response = app
            .clone()
            .oneshot(request("PUT", "/kv/user:123", Some(json!({"name": "ada"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await, json!({"success": true}));

        let response = app
            .clone()
            .oneshot(request("GET", "/kv/user:123", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(kv::LAST_UPDATED_HEADER));
        assert_eq!(json_of(response).await, json!({"name": "ada"}));

        let response = app
            .clone()
            .oneshot(request("POST", "/kv/user:123", Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_of(response).await["error"], "CONFLICT");

        let response = app
            .clone()
            .oneshot(request("PATCH", "/kv/user:123", Some(json!({"age": 36}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(
            app.clone()
                .oneshot(request("GET", "/kv/user:123", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body, json!({"name": "ada", "age": 36}));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request("DELETE", "/kv/user:123", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(request("GET", "/kv/user:123", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_kv_patch_missing_is_404() {
        let response = app()
            .oneshot(request("PATCH", "/kv/ghost", Some(json!({"a": 1}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_kv_invalid_key() {
        let response = app()
            .oneshot(request("PUT", "/kv/user/123", Some(json!(1))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_kv_invalid_json() {
        let req = Request::builder()
            .method("PUT")
            .uri("/kv/k")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_kv_oversized_body() {
        let big = json!({"blob": "x".repeat(2048)});
        let response = app()
            .oneshot(request("PUT", "/kv/big", Some(big)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_of(response).await["error"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_generate_raw() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::text_with_tokens(
            "hello", 5,
        )]));
        let response = app_with(provider.clone(), 1024)
            .oneshot(request(
                "POST",
                "/generate",
                Some(json!({"systemPrompt": "be brief", "input": "hi", "maxTokens": 16})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(generate::REQUEST_ID_HEADER));
        let body = json_of(response).await;
        assert_eq!(body["output"], "hello");
        assert_eq!(body["tokensUsed"], 5);
        assert_eq!(provider.calls()[0].max_tokens, 16);
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_input_without_calling_upstream() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::text("x")]));
        let response = app_with(provider.clone(), 1024)
            .oneshot(request("POST", "/generate", Some(json!({"input": "  "}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_validated_falls_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedTurn::text("nope"),
            ScriptedTurn::text("{\"title\": 3}"),
        ]));
        let response = app_with(provider.clone(), 1024)
            .oneshot(request(
                "POST",
                "/generate/validated",
                Some(json!({
                    "systemPrompt": "Name the chapter.",
                    "input": "The crew reaches the harbour.",
                    "schema": {"fields": {"title": {"type": "string"}}},
                    "fallback": {"title": "Untitled"}
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["output"], json!({"title": "Untitled"}));
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["attempts"], 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generate_validated_rejects_bad_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let response = app_with(provider.clone(), 1024)
            .oneshot(request(
                "POST",
                "/generate/validated",
                Some(json!({
                    "input": "x",
                    "schema": {"fields": {"title": {"type": "string"}}},
                    "fallback": {"title": 1}
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_timeout_maps_to_504() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::Timeout]));
        let response = app_with(provider, 1024)
            .oneshot(request("POST", "/generate", Some(json!({"input": "hi"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_of(response).await["error"], "UPSTREAM_TIMEOUT");
    }

    #[tokio::test]
    async fn test_cors_allow_list() {
        let app = app();
        let allowed = Request::builder()
            .method("GET")
            .uri("/health")
            .header(header::ORIGIN, "https://app.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example"
        );

        let denied = Request::builder()
            .method("GET")
            .uri("/health")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(denied).await.unwrap();
        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
