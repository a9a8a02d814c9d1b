//! Binding between definition kinds and their data sources.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gate_primitives::{DataSource, DefinitionKind};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::contracts::ComponentTarget;
use crate::integrations::{DataFetcher, FetchedDocument};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// What the orchestrator should do with a definition after fetching its data.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationInput {
    /// Evaluate the rules against this document.
    Document(Value),
    /// No data exists; record a failing result without evaluating.
    NoData,
    /// Produce no result for this definition.
    Skip,
}

/// Resolves each [`DefinitionKind`] to the fetcher bound to its data source.
#[derive(Clone)]
pub struct DefinitionRegistry {
    quality_report: Arc<dyn DataFetcher>,
    test_coverage: Arc<dyn DataFetcher>,
    dependency_graph: Arc<dyn DataFetcher>,
    artifact_summary: Arc<dyn DataFetcher>,
    fetch_timeout: Duration,
}

impl fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl DefinitionRegistry {
    /// Creates a registry from one fetcher per data source.
    #[must_use]
    pub fn new(
        quality_report: Arc<dyn DataFetcher>,
        test_coverage: Arc<dyn DataFetcher>,
        dependency_graph: Arc<dyn DataFetcher>,
        artifact_summary: Arc<dyn DataFetcher>,
    ) -> Self {
        Self {
            quality_report,
            test_coverage,
            dependency_graph,
            artifact_summary,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Overrides the per-fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Returns the fetcher bound to `source`.
    #[must_use]
    pub fn fetcher(&self, source: DataSource) -> &dyn DataFetcher {
        match source {
            DataSource::QualityReport => self.quality_report.as_ref(),
            DataSource::TestCoverage => self.test_coverage.as_ref(),
            DataSource::DependencyGraph => self.dependency_graph.as_ref(),
            DataSource::ArtifactSummary => self.artifact_summary.as_ref(),
        }
    }

    /// Fetches the document a definition of `kind` is evaluated against.
    ///
    /// Artifact-backed kinds evaluate only the first artifact's issue list and
    /// are skipped entirely when a delivered summary lists no artifacts. A
    /// summary that never arrives means no data, like any other source.
    pub async fn gather(&self, kind: DefinitionKind, target: &ComponentTarget) -> EvaluationInput {
        let source = kind.data_source();
        let document = self.fetch(source, target).await;

        match (source, document) {
            (DataSource::ArtifactSummary, FetchedDocument::Present(summary)) => {
                first_artifact_issues(&summary).map_or_else(
                    || {
                        debug!(definition = %kind, component_id = %target.component_id, "artifact summary lists no artifacts; skipping");
                        EvaluationInput::Skip
                    },
                    EvaluationInput::Document,
                )
            }
            (_, FetchedDocument::Present(document)) => EvaluationInput::Document(document),
            (_, FetchedDocument::Absent) => EvaluationInput::NoData,
        }
    }

    async fn fetch(&self, source: DataSource, target: &ComponentTarget) -> FetchedDocument {
        match timeout(self.fetch_timeout, self.fetcher(source).fetch(target)).await {
            Ok(document) => document,
            Err(_) => {
                warn!(
                    source = source.label(),
                    component_id = %target.component_id,
                    version = %target.version,
                    timeout_ms = u64::try_from(self.fetch_timeout.as_millis()).unwrap_or(u64::MAX),
                    "data fetch timed out"
                );
                FetchedDocument::Absent
            }
        }
    }
}

fn first_artifact_issues(summary: &Value) -> Option<Value> {
    let first = summary.get("artifacts")?.as_array()?.first()?;
    Some(first.get("issues").cloned().unwrap_or(Value::Null))
}
