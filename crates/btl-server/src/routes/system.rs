//! Service endpoints.

use axum::Json;
use axum::extract::State;

use super::ENDPOINTS;
use crate::response::{ApiResponse, HealthResponse, ServiceInfo};
use crate::state::AppState;

/// `GET /health` and `GET /api/health`.
pub(crate) async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let uptime_secs = state.uptime_secs();
    Json(ApiResponse::success(HealthResponse::healthy(
        state.version,
        uptime_secs,
    )))
}

/// `GET /` and `GET /api` - service description.
pub(crate) async fn root(State(state): State<AppState>) -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::success(ServiceInfo {
        name: "btl".to_string(),
        version: state.version,
        endpoints: ENDPOINTS.iter().map(ToString::to_string).collect(),
    }))
}
