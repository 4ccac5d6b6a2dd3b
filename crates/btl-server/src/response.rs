//! Success envelopes.

use serde::{Deserialize, Serialize};

/// Response wrapper used by the service and key store mutation endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` for responses built here.
    pub success: bool,
    /// Payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A successful response with no payload: `{"success":true}`.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

/// Health check payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Whole seconds since the process started.
    pub uptime_secs: u64,
}

impl HealthResponse {
    /// A healthy report for `version`.
    #[must_use]
    pub fn healthy(version: impl Into<String>, uptime_secs: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            version: version.into(),
            uptime_secs,
        }
    }
}

/// Service description returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Crate version.
    pub version: String,
    /// Mounted endpoints.
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_has_no_data() {
        let json = serde_json::to_string(&ApiResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_success_wraps_data() {
        let json =
            serde_json::to_value(ApiResponse::success(HealthResponse::healthy("1.2.3", 42)))
                .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "healthy");
        assert_eq!(json["data"]["version"], "1.2.3");
        assert_eq!(json["data"]["uptime_secs"], 42);
    }
}
