//! Logging configuration and setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format with colors.
    Pretty,
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
    /// Full format with all fields.
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Log output target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stdout.
    Stdout,
    /// Log to stderr.
    #[default]
    Stderr,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// Whether to include timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Directive overrides (e.g., `tower_http=debug`).
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create a new log config with the specified level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Set the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add several directive overrides.
    #[must_use]
    pub fn with_directives<I, D>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.directives.extend(directives.into_iter().map(Into::into));
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Build the env filter from config.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;

        for directive in &self.directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(e.to_string())
                },
            )?);
        }

        Ok(filter)
    }

    fn writer(&self) -> BoxMakeWriter {
        match self.target {
            LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }

    /// Build the formatting layer with its filter attached.
    fn build_layer(&self) -> TelemetryResult<BoxedLayer> {
        let filter = self.build_filter()?;
        let base = fmt::layer()
            .with_writer(self.writer())
            .with_ansi(self.ansi);

        let layer = match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().with_filter(filter).boxed(),
            (LogFormat::Json, false) => base.json().without_time().with_filter(filter).boxed(),
            (LogFormat::Pretty, true) => base.pretty().with_filter(filter).boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().with_filter(filter).boxed(),
            (LogFormat::Compact, true) => base.compact().with_filter(filter).boxed(),
            (LogFormat::Compact, false) => {
                base.compact().without_time().with_filter(filter).boxed()
            },
            (LogFormat::Full, true) => base.with_filter(filter).boxed(),
            (LogFormat::Full, false) => base.without_time().with_filter(filter).boxed(),
        };
        Ok(layer)
    }
}

/// Set up logging with the given configuration.
///
/// # Errors
///
/// Returns an error if the filter directives are invalid or a global
/// subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let layer = config.build_layer()?;
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.timestamps);
        assert!(config.ansi);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .with_target(LogTarget::Stdout)
            .without_timestamps()
            .without_ansi()
            .with_directives(["btl_gateway=trace", "hyper=warn"]);

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.target, LogTarget::Stdout);
        assert!(!config.timestamps);
        assert!(!config.ansi);
        assert_eq!(config.directives, vec!["btl_gateway=trace", "hyper=warn"]);
    }

    #[test]
    fn test_log_config_serialization() {
        let config = LogConfig::new("warn").with_format(LogFormat::Pretty);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"level\":\"warn\""));
        assert!(json.contains("\"format\":\"pretty\""));

        let parsed: LogConfig = serde_json::from_str(r#"{"level":"error"}"#).unwrap();
        assert_eq!(parsed.level, "error");
        assert_eq!(parsed.format, LogFormat::Compact);
        assert!(parsed.ansi);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("full".parse::<LogFormat>().unwrap(), LogFormat::Full);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_build_filter() {
        let config = LogConfig::new("debug").with_directives(["btl=trace"]);
        assert!(config.build_filter().is_ok());
    }

    #[test]
    fn test_build_filter_invalid() {
        let config = LogConfig::new("debug").with_directives(["[invalid=syntax"]);
        assert!(config.build_filter().is_err());
        assert!(config.build_layer().is_err());
    }

    #[test]
    fn test_every_format_builds() {
        for format in [
            LogFormat::Pretty,
            LogFormat::Compact,
            LogFormat::Json,
            LogFormat::Full,
        ] {
            assert!(LogConfig::new("info").with_format(format).build_layer().is_ok());
            assert!(
                LogConfig::new("info")
                    .with_format(format)
                    .without_timestamps()
                    .build_layer()
                    .is_ok()
            );
        }
    }
}
