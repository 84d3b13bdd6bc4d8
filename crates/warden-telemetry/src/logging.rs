//! Logging configuration and setup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Environment variable that replaces the configured filter when set.
pub const RUST_LOG_VAR: &str = "RUST_LOG";

fn init_err<E: fmt::Display>(e: E) -> TelemetryError {
    TelemetryError::InitError(e.to_string())
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format with colors.
    Pretty,
    /// Compact single-line format.
    #[default]
    Compact,
    /// JSON, one object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
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
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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
    /// Directive overrides (e.g., `warden_vault=debug`).
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

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
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

    /// Build a config from the `[logging]` section of the Warden config.
    ///
    /// # Errors
    ///
    /// Returns an error if the section names an unknown format.
    #[cfg(feature = "config")]
    pub fn from_section(section: &warden_config::LoggingSection) -> TelemetryResult<Self> {
        Ok(Self {
            level: section.level.clone(),
            format: section.format.parse()?,
            directives: section.directives.clone(),
            ..Self::default()
        })
    }

    /// Build the filter. A non-empty `rust_log` replaces level and directives.
    fn build_filter(&self, rust_log: Option<&str>) -> TelemetryResult<EnvFilter> {
        if let Some(spec) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
            return EnvFilter::try_new(spec)
                .map_err(|e| TelemetryError::ConfigError(format!("{RUST_LOG_VAR}: {e}")));
        }

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
}

/// Set up logging with the given configuration.
///
/// `RUST_LOG`, when set, overrides the configured level and directives.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let rust_log = std::env::var(RUST_LOG_VAR).ok();
    let filter = config.build_filter(rust_log.as_deref())?;

    match config.target {
        LogTarget::Stdout => init_with_writer(filter, config, std::io::stdout),
        LogTarget::Stderr => init_with_writer(filter, config, std::io::stderr),
    }
}

fn init_with_writer<W>(filter: EnvFilter, config: &LogConfig, writer: W) -> TelemetryResult<()>
where
    W: for<'a> tfmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => registry
            .with(tfmt::layer().json().with_writer(writer))
            .try_init(),
        (LogFormat::Json, false) => registry
            .with(tfmt::layer().json().with_writer(writer).without_time())
            .try_init(),
        (LogFormat::Pretty, true) => registry
            .with(tfmt::layer().pretty().with_writer(writer).with_ansi(config.ansi))
            .try_init(),
        (LogFormat::Pretty, false) => registry
            .with(
                tfmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(tfmt::layer().compact().with_writer(writer).with_ansi(config.ansi))
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                tfmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .without_time(),
            )
            .try_init(),
    }
    .map_err(init_err)
}

/// Set up default logging (info level, stderr, compact format).
///
/// # Errors
///
/// Returns an error if logging cannot be initialized.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
