//! Shared stubs and seed data for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gate_primitives::{
    Component, ComponentActivity, ComponentActivityId, ComponentActivityKind, ComponentId,
    ComponentVersion, ComponentVersionId, DefinitionId, DefinitionKind, GateConfig, Pipeline,
    PipelineId, PolicyConfig, PolicyDefinition, PolicyDraft, PolicyId, RuleSpec, Stage, StageId,
    TeamId, Violation,
};
use gate_store::{InMemoryDirectory, InMemoryStore};
use serde_json::{json, Value};

use crate::clock::FixedClock;
use crate::contracts::{ComponentTarget, EvaluationRequest};
use crate::decision::EvaluationVerdict;
use crate::engine::{PolicyError, PolicyResult, RuleEvaluator};
use crate::integrations::{DataFetcher, FetchedDocument};
use crate::registry::DefinitionRegistry;
use crate::service::Backends;

pub(crate) const TEAM: &str = "team-a";

pub(crate) fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_secs, 0)
        .single()
        .unwrap()
}

pub(crate) fn team() -> TeamId {
    TeamId::new(TEAM).unwrap()
}

pub(crate) fn definition_id(kind: DefinitionKind) -> DefinitionId {
    DefinitionId::new(format!("def-{}", kind.key())).unwrap()
}

pub(crate) fn catalog() -> Vec<PolicyDefinition> {
    DefinitionKind::ALL
        .iter()
        .zip(0_u32..)
        .map(|(kind, order)| PolicyDefinition {
            id: definition_id(*kind),
            name: kind.key().replace('_', " "),
            key: kind.key().to_owned(),
            description: None,
            order,
        })
        .collect()
}

pub(crate) fn rule(metric: &str, operator: &str, value: &str) -> RuleSpec {
    RuleSpec::from([
        ("metric".to_owned(), metric.to_owned()),
        ("operator".to_owned(), operator.to_owned()),
        ("value".to_owned(), value.to_owned()),
    ])
}

pub(crate) fn draft(name: &str, configs: Vec<(DefinitionKind, Vec<RuleSpec>)>) -> PolicyDraft {
    PolicyDraft {
        name: name.to_owned(),
        team_id: Some(team()),
        definitions: configs
            .into_iter()
            .map(|(kind, rules)| PolicyConfig::new(definition_id(kind), rules))
            .collect(),
    }
}

/// Returns the same document for every target.
pub(crate) struct StaticFetcher(pub(crate) FetchedDocument);

#[async_trait]
impl DataFetcher for StaticFetcher {
    async fn fetch(&self, _target: &ComponentTarget) -> FetchedDocument {
        self.0.clone()
    }
}

pub(crate) fn present(value: Value) -> Arc<dyn DataFetcher> {
    Arc::new(StaticFetcher(FetchedDocument::Present(value)))
}

pub(crate) fn absent() -> Arc<dyn DataFetcher> {
    Arc::new(StaticFetcher(FetchedDocument::Absent))
}

/// Fails every rule whose metric in the input document is below `value`.
pub(crate) struct ThresholdEvaluator;

#[async_trait]
impl RuleEvaluator for ThresholdEvaluator {
    async fn evaluate(&self, request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict> {
        let mut violations = Vec::new();
        for rule in &request.policy().rules {
            let metric = rule.get("metric").map_or("", String::as_str);
            let threshold = rule
                .get("value")
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or_default();
            let observed = request.data().get(metric).and_then(Value::as_f64);
            if observed.is_none_or(|observed| observed < threshold) {
                violations.push(Violation::new(
                    metric,
                    format!("{metric} below {threshold}"),
                    false,
                ));
            }
        }
        Ok(if violations.is_empty() {
            EvaluationVerdict::pass()
        } else {
            EvaluationVerdict::fail(violations)
        })
    }
}

/// Always fails to reach the engine.
pub(crate) struct UnreachableEvaluator;

#[async_trait]
impl RuleEvaluator for UnreachableEvaluator {
    async fn evaluate(&self, _request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict> {
        Err(PolicyError::evaluator("connection refused"))
    }
}

/// Registry where quality, coverage, and dependency data satisfy nothing and
/// the artifact summary lists one artifact with one issue.
pub(crate) fn registry() -> DefinitionRegistry {
    DefinitionRegistry::new(
        present(json!({"bugs": 3})),
        present(json!({"coverage": 40})),
        present(json!({"packages": 12})),
        present(json!({"artifacts": [{"name": "app.jar", "issues": [{"cve": "CVE-1"}]}]})),
    )
}

pub(crate) struct Harness {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) directory: Arc<InMemoryDirectory>,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) backends: Backends,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(InMemoryStore::with_definitions(catalog()));
        let directory = Arc::new(InMemoryDirectory::new());
        let clock = Arc::new(FixedClock::new(ts(0)));
        let backends = Backends::in_memory(store.clone(), directory.clone(), clock.clone());
        Self {
            store,
            directory,
            clock,
            backends,
        }
    }

    /// Seeds one team pipeline with a stage, a component, and a version.
    pub(crate) async fn seed_pipeline(&self, stage: &str, gates: Option<GateConfig>) {
        self.directory
            .insert_pipeline(Pipeline {
                id: PipelineId::new("pl-1").unwrap(),
                team_id: team(),
                name: "main".into(),
            })
            .await;
        self.set_stage(stage, gates).await;
        self.directory
            .insert_component(Component {
                id: ComponentId::new("cmp-1").unwrap(),
                team_id: team(),
                name: "billing".into(),
            })
            .await;
        self.directory
            .insert_version(ComponentVersion {
                id: ComponentVersionId::new("ver-1").unwrap(),
                component_id: ComponentId::new("cmp-1").unwrap(),
                name: "1.0.0".into(),
            })
            .await;
    }

    pub(crate) async fn set_stage(&self, stage: &str, gates: Option<GateConfig>) {
        self.directory
            .upsert_stage(Stage {
                id: StageId::new(stage).unwrap(),
                pipeline_id: PipelineId::new("pl-1").unwrap(),
                name: stage.to_uppercase(),
                gates,
            })
            .await;
    }

    /// Records a gate run of `cmp-1`/`ver-1` at `stage`.
    pub(crate) async fn gate_run(&self, id: &str, stage: &str, at: DateTime<Utc>) {
        self.directory
            .record_activity(ComponentActivity {
                id: ComponentActivityId::new(id).unwrap(),
                component_id: ComponentId::new("cmp-1").unwrap(),
                version_id: ComponentVersionId::new("ver-1").unwrap(),
                stage_id: StageId::new(stage).unwrap(),
                kind: ComponentActivityKind::Gates,
                created_at: at,
            })
            .await;
    }
}

pub(crate) fn gates(enabled: bool, policies: &[&PolicyId]) -> Option<GateConfig> {
    Some(GateConfig {
        enabled,
        policies: policies.iter().map(|id| (*id).clone()).collect(),
    })
}
