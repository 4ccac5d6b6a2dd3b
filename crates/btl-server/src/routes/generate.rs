//! Generation endpoints.
//!
//! Each call runs inside a request span. A UUID in the
//! `x-correlation-id` request header is carried into that span, and the
//! response echoes the span's request id in `x-request-id`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{Instrument, info};

use btl_gateway::{
    GenerationOutput, GenerationRequest, GenerationSpec, ResultSchema, ValidatedOutput,
};
use btl_telemetry::RequestContext;

use super::{GENERATE_BODY_LIMIT, decode_body};
use crate::error::ApiResult;
use crate::state::AppState;

/// Response header carrying the request id.
pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";
/// Request header carrying an upstream correlation id.
pub(crate) const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Body of `POST /generate/validated`.
#[derive(Debug, Deserialize)]
struct ValidatedBody {
    #[serde(flatten)]
    request: GenerationRequest,
    schema: ResultSchema,
    fallback: Value,
}

fn request_context(headers: &HeaderMap, operation: &str) -> RequestContext {
    let correlation = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    RequestContext::new("http")
        .with_correlation_header(correlation)
        .with_operation(operation)
}

fn request_id_header(ctx: &RequestContext) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(id) = HeaderValue::from_str(&ctx.request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, id);
    }
    headers
}

/// `POST /generate` - one upstream call, raw text out.
pub(crate) async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(HeaderMap, Json<GenerationOutput>)> {
    let request: GenerationRequest = decode_body(body, GENERATE_BODY_LIMIT)?;
    let ctx = request_context(&headers, "generate");

    let output = async {
        let output = state.gateway.generate_raw(&request).await?;
        info!(
            elapsed_ms = ctx.elapsed_ms(),
            tokens_used = output.tokens_used,
            "raw generation complete"
        );
        ApiResult::Ok(output)
    }
    .instrument(ctx.span())
    .await?;

    Ok((request_id_header(&ctx), Json(output)))
}

/// `POST /generate/validated` - the retry-then-fallback protocol.
pub(crate) async fn generate_validated(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(HeaderMap, Json<ValidatedOutput>)> {
    let body: ValidatedBody = decode_body(body, GENERATE_BODY_LIMIT)?;
    let spec = GenerationSpec::new(body.request, body.schema, body.fallback)?;
    let ctx = request_context(&headers, "generate_validated");

    let output = async {
        let output = state.gateway.generate_validated(&spec).await?;
        info!(
            elapsed_ms = ctx.elapsed_ms(),
            source = ?output.source,
            attempts = output.attempts,
            "validated generation complete"
        );
        ApiResult::Ok(output)
    }
    .instrument(ctx.span())
    .await?;

    Ok((request_id_header(&ctx), Json(output)))
}
