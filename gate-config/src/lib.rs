//! Configuration for the policy gate engine and its HTTP collaborators.
//!
//! Values come from `GATE_*` environment variables ([`GateConfig::from_env`])
//! or a JSON document ([`GateConfig::from_json_file`]). Every field has a
//! default except the remote endpoints, which are only required when the HTTP
//! adapters are wired.

#![warn(missing_docs, clippy::pedantic)]

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use gate_primitives::DataSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Insights window settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Trailing window length in months.
    pub period_months: u32,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self { period_months: 3 }
    }
}

/// Artifact repository endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the repository service.
    pub base_url: Option<String>,
    /// Path template of static analysis reports.
    pub quality_report_path: String,
    /// Path template of test coverage reports.
    pub test_coverage_path: String,
    /// Path template of dependency graphs.
    pub dependency_graph_path: String,
    /// Path template of artifact summaries.
    pub artifact_summary_path: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            quality_report_path: "/sonarqube/report/{component}/{version}".to_owned(),
            test_coverage_path: "/sonarqube/coverage/{component}/{version}".to_owned(),
            dependency_graph_path: "/dependency-graph/{component}/{version}".to_owned(),
            artifact_summary_path: "/artifact-summary/{component}/{version}".to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RepositoryConfig {
    /// Returns the path template serving `source`.
    #[must_use]
    pub fn path_template(&self, source: DataSource) -> &str {
        match source {
            DataSource::QualityReport => &self.quality_report_path,
            DataSource::TestCoverage => &self.test_coverage_path,
            DataSource::DependencyGraph => &self.dependency_graph_path,
            DataSource::ArtifactSummary => &self.artifact_summary_path,
        }
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Rule evaluator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Evaluation endpoint URL.
    pub url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EvaluatorConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Insights window.
    pub insights: InsightsConfig,
    /// Artifact repository.
    pub repository: RepositoryConfig,
    /// Rule evaluator.
    pub evaluator: EvaluatorConfig,
    /// Newline-delimited JSON activity journal; activities stay in memory when unset.
    pub journal_path: Option<PathBuf>,
    /// Default tracing filter directive.
    pub log_filter: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            insights: InsightsConfig::default(),
            repository: RepositoryConfig::default(),
            evaluator: EvaluatorConfig::default(),
            journal_path: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl GateConfig {
    /// Loads configuration from `GATE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable cannot be parsed or the result
    /// fails [`GateConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, applying defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric value cannot be parsed or the result
    /// fails [`GateConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(months) = read("GATE_INSIGHTS_PERIOD_MONTHS") {
            config.insights.period_months = parse(&months, "GATE_INSIGHTS_PERIOD_MONTHS")?;
        }

        let repository = &mut config.repository;
        repository.base_url = read("GATE_REPOSITORY_BASE_URL");
        for (key, slot) in [
            (
                "GATE_REPOSITORY_QUALITY_REPORT_PATH",
                &mut repository.quality_report_path,
            ),
            (
                "GATE_REPOSITORY_TEST_COVERAGE_PATH",
                &mut repository.test_coverage_path,
            ),
            (
                "GATE_REPOSITORY_DEPENDENCY_GRAPH_PATH",
                &mut repository.dependency_graph_path,
            ),
            (
                "GATE_REPOSITORY_ARTIFACT_SUMMARY_PATH",
                &mut repository.artifact_summary_path,
            ),
        ] {
            if let Some(value) = read(key) {
                *slot = value;
            }
        }
        if let Some(timeout) = read("GATE_REPOSITORY_TIMEOUT_MS") {
            repository.timeout_ms = parse(&timeout, "GATE_REPOSITORY_TIMEOUT_MS")?;
        }

        config.evaluator.url = read("GATE_EVALUATOR_URL");
        if let Some(timeout) = read("GATE_EVALUATOR_TIMEOUT_MS") {
            config.evaluator.timeout_ms = parse(&timeout, "GATE_EVALUATOR_TIMEOUT_MS")?;
        }

        config.journal_path = read("GATE_JOURNAL_PATH").map(PathBuf::from);
        if let Some(filter) = read("GATE_LOG_FILTER") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or the result
    /// fails [`GateConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks value ranges and URL schemes.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.insights.period_months > 0,
            "insights.period_months must be positive"
        );
        ensure!(
            self.repository.timeout_ms > 0,
            "repository.timeout_ms must be positive"
        );
        ensure!(
            self.evaluator.timeout_ms > 0,
            "evaluator.timeout_ms must be positive"
        );
        if let Some(url) = &self.repository.base_url {
            check_http_url(url, "repository.base_url")?;
        }
        if let Some(url) = &self.evaluator.url {
            check_http_url(url, "evaluator.url")?;
        }
        Ok(())
    }
}

fn parse<T>(value: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid {key}: {value}"))
}

fn check_http_url(url: &str, field: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        bail!("{field} must start with http:// or https://, got `{url}`")
    }
}
