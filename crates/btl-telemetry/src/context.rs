//! Request context for correlation and tracing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data carried through one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Correlation ID shared by related requests.
    pub correlation_id: Uuid,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Component that created this context.
    pub source: String,
    /// Operation being performed.
    pub operation: Option<String>,
}

impl RequestContext {
    /// Create a new request context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
        }
    }

    /// Set the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Take the correlation ID from an inbound header value, if it parses.
    #[must_use]
    pub fn with_correlation_header(self, header: Option<&str>) -> Self {
        match header.and_then(|h| Uuid::parse_str(h.trim()).ok()) {
            Some(id) => self.with_correlation_id(id),
            None => self,
        }
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Create a tracing span with this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }
}
