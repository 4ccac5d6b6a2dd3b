//! Hooks for schema validation failures.

use tracing::warn;

/// Which attempt of the protocol produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The first call, with the caller's prompt.
    First,
    /// The second call, with the stricter prompt.
    StrictRetry,
}

impl Attempt {
    /// 1-based attempt number.
    #[must_use]
    pub fn number(self) -> u32 {
        match self {
            Self::First => 1,
            Self::StrictRetry => 2,
        }
    }
}

/// A generated output that could not be used.
#[derive(Debug, Clone)]
pub struct ValidationFailure<'a> {
    /// Which attempt failed.
    pub attempt: Attempt,
    /// Model that produced the output.
    pub model: &'a str,
    /// Why the output was rejected.
    pub reason: &'a str,
    /// The raw output text.
    pub raw_output: &'a str,
}

/// Receives every validation failure before the gateway retries or falls back.
pub trait ValidationObserver: Send + Sync {
    /// Called once per rejected output.
    fn on_validation_failure(&self, failure: &ValidationFailure<'_>);
}

/// Default observer: a `warn!` event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ValidationObserver for TracingObserver {
    fn on_validation_failure(&self, failure: &ValidationFailure<'_>) {
        warn!(
            attempt = failure.attempt.number(),
            model = failure.model,
            reason = failure.reason,
            output_len = failure.raw_output.len(),
            "generated output failed validation"
        );
    }
}
