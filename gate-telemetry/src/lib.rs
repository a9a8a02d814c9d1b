//! Structured logging setup shared by policy gate binaries.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// Multi-line output with span context.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Whether to include the event target.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_owned(),
            format: LogFormat::Compact,
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Creates a configuration with the supplied default filter.
    #[must_use]
    pub fn with_filter(default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            ..Self::default()
        }
    }

    /// Resolves the effective filter, preferring `RUST_LOG`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured directive cannot be parsed.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.default_filter)
            .with_context(|| format!("invalid log filter `{}`", self.default_filter))
    }
}

/// Installs the global tracing subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error when the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
