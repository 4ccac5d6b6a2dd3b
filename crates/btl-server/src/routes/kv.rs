//! Key store endpoints under `/kv/{key}`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use super::decode_body;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Response header carrying a record's last update time (RFC 3339).
pub(crate) const LAST_UPDATED_HEADER: &str = "x-last-updated";

/// `GET /kv/{key}` - the stored document.
pub(crate) async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    let record = state.store.get(&key).await?;

    let mut headers = HeaderMap::new();
    if let Ok(stamp) = HeaderValue::from_str(&record.last_updated.to_rfc3339()) {
        headers.insert(LAST_UPDATED_HEADER, stamp);
    }
    Ok((headers, Json(record.value)))
}

/// `PUT /kv/{key}` - create or replace.
pub(crate) async fn put_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let value: Value = decode_body(body, state.max_payload_bytes())?;
    state.store.put(&key, value).await?;
    debug!(key = %key, "put");
    Ok(Json(ApiResponse::ok()))
}

/// `POST /kv/{key}` - create only.
pub(crate) async fn create_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let value: Value = decode_body(body, state.max_payload_bytes())?;
    state.store.create(&key, value).await?;
    debug!(key = %key, "create");
    Ok(Json(ApiResponse::ok()))
}

/// `PATCH /kv/{key}` - merge into an existing document.
pub(crate) async fn patch_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let partial: Value = decode_body(body, state.max_payload_bytes())?;
    state.store.patch(&key, partial).await?;
    debug!(key = %key, "patch");
    Ok(Json(ApiResponse::ok()))
}

/// `DELETE /kv/{key}` - idempotent.
pub(crate) async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.store.delete(&key).await?;
    debug!(key = %key, "delete");
    Ok(Json(ApiResponse::ok()))
}
