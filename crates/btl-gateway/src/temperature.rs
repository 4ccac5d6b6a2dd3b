//! Per-model temperature capabilities.
//!
//! Some models accept any temperature in a range, some only their own
//! fixed default, and some reject the parameter outright. The table is
//! keyed by exact model identifier and supplied by configuration; there is
//! no prefix or substring matching.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a model treats the temperature parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TemperaturePolicy {
    /// Any value in `min..=max`; requests are clamped.
    Adjustable {
        /// Lowest accepted value.
        min: f64,
        /// Highest accepted value.
        max: f64,
    },
    /// Only this value is accepted; requests are ignored.
    Fixed {
        /// The model's fixed temperature.
        value: f64,
    },
    /// The parameter must not be sent.
    Omit,
}

impl TemperaturePolicy {
    /// Temperature to send for `requested`, or `None` to omit it.
    ///
    /// An inverted range resolves to its `max`, and a NaN bound is ignored.
    #[must_use]
    pub fn resolve(&self, requested: f64) -> Option<f64> {
        match *self {
            Self::Adjustable { min, max } => {
                if min > max {
                    warn!(min, max, "inverted temperature range");
                }
                Some(requested.max(min).min(max))
            },
            Self::Fixed { value } => Some(value),
            Self::Omit => None,
        }
    }
}

/// Default range for models missing from the table.
pub const DEFAULT_TEMPERATURE_RANGE: (f64, f64) = (0.0, 1.0);

/// Exact-match table of model temperature capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityTable {
    models: HashMap<String, TemperaturePolicy>,
    fallback: TemperaturePolicy,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPERATURE_RANGE)
    }
}

impl CapabilityTable {
    /// Empty table; unknown models use `default_range`.
    #[must_use]
    pub fn new(default_range: (f64, f64)) -> Self {
        let (min, max) = default_range;
        Self {
            models: HashMap::new(),
            fallback: TemperaturePolicy::Adjustable { min, max },
        }
    }

    /// Register a model's policy.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, policy: TemperaturePolicy) -> Self {
        self.models.insert(model.into(), policy);
        self
    }

    /// Register many policies at once.
    #[must_use]
    pub fn with_models(
        mut self,
        models: impl IntoIterator<Item = (String, TemperaturePolicy)>,
    ) -> Self {
        self.models.extend(models);
        self
    }

    /// Policy for `model`.
    #[must_use]
    pub fn policy(&self, model: &str) -> TemperaturePolicy {
        self.models.get(model).copied().unwrap_or(self.fallback)
    }

    /// Temperature to send to `model` for a `requested` value.
    #[must_use]
    pub fn resolve(&self, model: &str, requested: f64) -> Option<f64> {
        self.policy(model).resolve(requested)
    }
}
