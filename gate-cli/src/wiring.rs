use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gate_adapters::{OpaConfig, OpaEvaluator, RepositoryFetcher};
use gate_config::{GateConfig, RepositoryConfig};
use gate_policy::{
    Backends, ComponentTarget, DataFetcher, DefinitionRegistry, EngineSettings, EvaluationRequest,
    EvaluationVerdict, FetchedDocument, PolicyError, PolicyResult, PolicyService, RuleEvaluator,
    SystemClock,
};
use gate_primitives::{DataSource, PolicyDefinition};
use gate_store::{DefinitionCatalog, FileActivityJournal, StateSnapshot};
use tracing::{info, warn};

/// Stand-in for collaborators whose endpoint is not configured.
struct Offline;

#[async_trait]
impl DataFetcher for Offline {
    async fn fetch(&self, _target: &ComponentTarget) -> FetchedDocument {
        FetchedDocument::Absent
    }
}

#[async_trait]
impl RuleEvaluator for Offline {
    async fn evaluate(&self, _request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict> {
        Err(PolicyError::evaluator("evaluator URL not configured"))
    }
}

pub(crate) async fn build_service(
    config: &GateConfig,
    state: Option<&Path>,
    journal: Option<&Path>,
) -> Result<PolicyService> {
    let snapshot = match state {
        Some(path) => StateSnapshot::load(path)
            .await
            .with_context(|| format!("failed to load state from {}", path.display()))?,
        None => StateSnapshot::default(),
    };
    let seeded_activities = snapshot.policy_activities.clone();
    let (store, directory) = snapshot.hydrate().await?;
    if store.definitions().await?.is_empty() {
        for definition in PolicyDefinition::standard_catalog() {
            store.seed_definition(definition).await;
        }
    }

    let mut backends = Backends::in_memory(
        Arc::new(store),
        Arc::new(directory),
        Arc::new(SystemClock),
    );
    if let Some(path) = journal.or(config.journal_path.as_deref()) {
        let journal = FileActivityJournal::open(path)
            .await
            .with_context(|| format!("failed to open journal {}", path.display()))?;
        let imported = journal.import(&seeded_activities).await?;
        info!(path = %journal.path().display(), imported, "recording activities to journal");
        backends = backends.with_activity_log(Arc::new(journal));
    }

    let settings = EngineSettings {
        insights_period_months: config.insights.period_months,
        evaluation_timeout: config.evaluator.timeout(),
    };
    Ok(PolicyService::new(
        backends,
        registry(&config.repository)?,
        evaluator(config)?,
        settings,
    ))
}

fn registry(config: &RepositoryConfig) -> Result<DefinitionRegistry> {
    let Some(base_url) = config.base_url.as_deref() else {
        warn!("repository base URL not configured; every data source reports no data");
        let offline: Arc<dyn DataFetcher> = Arc::new(Offline);
        return Ok(DefinitionRegistry::new(
            offline.clone(),
            offline.clone(),
            offline.clone(),
            offline,
        ));
    };

    let fetcher = |source: DataSource| -> Result<Arc<dyn DataFetcher>> {
        let endpoint =
            gate_adapters::RepositoryConfig::new(base_url, config.path_template(source))?
                .with_timeout(config.timeout());
        Ok(Arc::new(RepositoryFetcher::new(source, endpoint)?))
    };

    Ok(DefinitionRegistry::new(
        fetcher(DataSource::QualityReport)?,
        fetcher(DataSource::TestCoverage)?,
        fetcher(DataSource::DependencyGraph)?,
        fetcher(DataSource::ArtifactSummary)?,
    )
    .with_fetch_timeout(config.timeout()))
}

fn evaluator(config: &GateConfig) -> Result<Arc<dyn RuleEvaluator>> {
    let Some(url) = config.evaluator.url.as_deref() else {
        warn!("evaluator URL not configured; evaluated definitions will fail");
        return Ok(Arc::new(Offline));
    };
    let opa = OpaConfig::new(url)?.with_timeout(config.evaluator.timeout());
    Ok(Arc::new(OpaEvaluator::new(opa)?))
}
