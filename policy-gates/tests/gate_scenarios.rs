use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use policy_gates::policy::{
    Backends, ComponentTarget, DataFetcher, DefinitionRegistry, EngineSettings, EvaluationRequest,
    EvaluationVerdict, FetchedDocument, FixedClock, PolicyResult, PolicyService, RecordLabels,
    RuleEvaluator, ValidationRequest, ViolationKey, ViolationLedger,
};
use policy_gates::primitives::{
    ActivityId, Component, ComponentActivity, ComponentActivityId, ComponentActivityKind,
    ComponentId, ComponentVersion, ComponentVersionId, DefinitionId, DefinitionKind,
    DefinitionResult, GateConfig, Pipeline, PipelineId, PolicyActivity, PolicyConfig,
    PolicyDefinition, PolicyDraft, PolicyId, RuleSpec, Stage, StageId, TeamId, Violation,
};
use policy_gates::store::{FileActivityJournal, InMemoryDirectory, InMemoryStore, PolicyStore};
use serde_json::{Value, json};

fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap() + Duration::seconds(offset_secs)
}

fn team() -> TeamId {
    TeamId::new("payments").unwrap()
}

struct StaticFetcher(Value);

#[async_trait]
impl DataFetcher for StaticFetcher {
    async fn fetch(&self, _target: &ComponentTarget) -> FetchedDocument {
        FetchedDocument::Present(self.0.clone())
    }
}

struct MissingFetcher;

#[async_trait]
impl DataFetcher for MissingFetcher {
    async fn fetch(&self, _target: &ComponentTarget) -> FetchedDocument {
        FetchedDocument::Absent
    }
}

/// Fails each `metric >= value` rule the input document does not satisfy.
struct MinimumEvaluator;

#[async_trait]
impl RuleEvaluator for MinimumEvaluator {
    async fn evaluate(&self, request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict> {
        let violations: Vec<Violation> = request
            .policy()
            .rules
            .iter()
            .filter_map(|rule| {
                let metric = rule.get("metric")?;
                let minimum: f64 = rule.get("value")?.parse().ok()?;
                let observed = request.data().get(metric).and_then(Value::as_f64)?;
                (observed < minimum).then(|| {
                    Violation::new(metric.clone(), format!("{observed} < {minimum}"), false)
                })
            })
            .collect();
        Ok(if violations.is_empty() {
            EvaluationVerdict::pass()
        } else {
            EvaluationVerdict::fail(violations)
        })
    }
}

struct World {
    store: Arc<InMemoryStore>,
    directory: Arc<InMemoryDirectory>,
    clock: Arc<FixedClock>,
    service: PolicyService,
}

impl World {
    async fn new() -> Self {
        Self::with_backends(|backends| backends).await
    }

    async fn with_backends(customize: impl FnOnce(Backends) -> Backends) -> Self {
        let store = Arc::new(InMemoryStore::with_definitions([PolicyDefinition {
            id: DefinitionId::new("def-coverage").unwrap(),
            name: "unit-test coverage".into(),
            key: DefinitionKind::UnitTests.key().into(),
            description: Some("Minimum line coverage".into()),
            order: 1,
        }]));
        let directory = Arc::new(InMemoryDirectory::new());
        let clock = Arc::new(FixedClock::new(at(0)));
        let backends = customize(Backends::in_memory(
            store.clone(),
            directory.clone(),
            clock.clone(),
        ));
        let registry = DefinitionRegistry::new(
            Arc::new(MissingFetcher),
            Arc::new(StaticFetcher(json!({"unit-test coverage": 40}))),
            Arc::new(MissingFetcher),
            Arc::new(MissingFetcher),
        );
        let service = PolicyService::new(
            backends,
            registry,
            Arc::new(MinimumEvaluator),
            EngineSettings::default(),
        );

        directory
            .insert_pipeline(Pipeline {
                id: PipelineId::new("checkout").unwrap(),
                team_id: team(),
                name: "checkout".into(),
            })
            .await;
        directory
            .insert_component(Component {
                id: ComponentId::new("ledger-api").unwrap(),
                team_id: team(),
                name: "ledger-api".into(),
            })
            .await;
        directory
            .insert_version(ComponentVersion {
                id: ComponentVersionId::new("ledger-api-2.1.0").unwrap(),
                component_id: ComponentId::new("ledger-api").unwrap(),
                name: "2.1.0".into(),
            })
            .await;

        Self {
            store,
            directory,
            clock,
            service,
        }
    }

    async fn coverage_policy(&self) -> PolicyId {
        let rule = RuleSpec::from([
            ("metric".to_owned(), "unit-test coverage".to_owned()),
            ("operator".to_owned(), "GREATER_THAN_OR_EQUAL".to_owned()),
            ("value".to_owned(), "80".to_owned()),
        ]);
        let policy = self
            .service
            .create_policy(PolicyDraft {
                name: "release readiness".into(),
                team_id: Some(team()),
                definitions: vec![PolicyConfig::new(
                    DefinitionId::new("def-coverage").unwrap(),
                    vec![rule],
                )],
            })
            .await
            .unwrap();
        policy.id().clone()
    }

    async fn stage(&self, enabled: bool, policy: &PolicyId) {
        self.directory
            .upsert_stage(Stage {
                id: StageId::new("production").unwrap(),
                pipeline_id: PipelineId::new("checkout").unwrap(),
                name: "production".into(),
                gates: Some(GateConfig {
                    enabled,
                    policies: vec![policy.clone()],
                }),
            })
            .await;
    }

    async fn gate_run(&self, id: &str) -> ComponentActivityId {
        let id = ComponentActivityId::new(id).unwrap();
        self.directory
            .record_activity(ComponentActivity {
                id: id.clone(),
                component_id: ComponentId::new("ledger-api").unwrap(),
                version_id: ComponentVersionId::new("ledger-api-2.1.0").unwrap(),
                stage_id: StageId::new("production").unwrap(),
                kind: ComponentActivityKind::Gates,
                created_at: self.clock_now(),
            })
            .await;
        id
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use policy_gates::policy::Clock;
        self.clock.now()
    }

    async fn validate(&self, policy: &PolicyId, gate_run: &ComponentActivityId) -> PolicyActivity {
        self.service
            .validate(ValidationRequest::new(
                policy.clone(),
                gate_run.clone(),
                ComponentId::new("ledger-api").unwrap(),
                "2.1.0",
            ))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn low_coverage_fails_and_repeated_validations_share_one_insight() {
    let world = World::new().await;
    let policy = world.coverage_policy().await;
    let gate_run = world.gate_run("run-1").await;

    let first = world.validate(&policy, &gate_run).await;
    world.clock.advance(Duration::minutes(5));
    let second = world.validate(&policy, &gate_run).await;

    for activity in [&first, &second] {
        assert!(!activity.is_valid());
        assert_eq!(activity.results().len(), 1);
        let result = &activity.results()[0];
        assert!(!result.is_valid());
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].metric, "unit-test coverage");
    }
    assert_ne!(first.id(), second.id());
    assert_eq!(world.store.activity_count().await, 2);

    let insights = world.service.insights(&team()).await.unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].policy_id, policy);
    assert_eq!(insights[0].insights.len(), 1);
    assert_eq!(insights[0].insights[0].violation_count, 2);
    assert_eq!(insights[0].insights[0].created_at, at(0));
}

#[tokio::test]
async fn enabling_a_gate_surfaces_its_violations() {
    let world = World::new().await;
    let policy = world.coverage_policy().await;
    world.stage(false, &policy).await;
    let gate_run = world.gate_run("run-1").await;
    world.validate(&policy, &gate_run).await;

    assert!(world.service.violations(&team()).await.unwrap().is_empty());

    world.stage(true, &policy).await;
    let records = world.service.violations(&team()).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.key.policy_id, policy);
    assert_eq!(record.key.stage_id.as_str(), "production");
    assert_eq!(record.labels.policy_name, "release readiness");
    assert_eq!(record.labels.version_name, "2.1.0");
    assert_eq!(record.violation_count, 1);
    assert!(record.definition_names.contains("unit-test coverage"));
}

#[tokio::test]
async fn later_gate_run_replaces_earlier_violations() {
    let world = World::new().await;
    let policy = world.coverage_policy().await;
    world.stage(true, &policy).await;

    let first_run = world.gate_run("run-1").await;
    world.validate(&policy, &first_run).await;
    world.clock.advance(Duration::hours(1));
    let second_run = world.gate_run("run-2").await;
    world.validate(&policy, &second_run).await;
    world.clock.advance(Duration::minutes(1));
    world.validate(&policy, &second_run).await;

    let records = world.service.violations(&team()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].violation_count, 1);
    assert_eq!(
        records[0].latest_activity_at,
        at(0) + Duration::hours(1) + Duration::minutes(1)
    );
}

#[test]
fn violation_fold_ignores_observation_order() {
    let key = ViolationKey::new(
        PolicyId::new("p").unwrap(),
        ComponentId::new("c").unwrap(),
        ComponentVersionId::new("v").unwrap(),
        StageId::new("s").unwrap(),
    );
    let activity = |id: &str, offset: i64, failures: usize| {
        let mut builder = PolicyActivity::builder(
            PolicyId::new("p").unwrap(),
            ComponentActivityId::new("run").unwrap(),
            at(offset),
        )
        .id(ActivityId::new(id).unwrap());
        for index in 0..failures {
            builder.push_result(DefinitionResult::no_data(
                DefinitionId::new(format!("d{index}")).unwrap(),
                &format!("definition {index}"),
            ));
        }
        builder.build()
    };
    let activities = [
        activity("a", 10, 3),
        activity("b", 20, 1),
        activity("c", 20, 2),
        activity("d", 5, 4),
    ];
    let orders: [[usize; 4]; 5] = [
        [0, 1, 2, 3],
        [3, 2, 1, 0],
        [1, 3, 0, 2],
        [2, 0, 3, 1],
        [0, 2, 3, 1],
    ];

    let folded: Vec<_> = orders
        .iter()
        .map(|order| {
            let mut ledger = ViolationLedger::new();
            for index in order {
                let activity = &activities[*index];
                let names = activity
                    .failing_results()
                    .map(|result| result.definition_id().to_string())
                    .collect();
                ledger.observe(key.clone(), RecordLabels::default(), activity, names);
            }
            ledger.finish()
        })
        .collect();

    for records in &folded {
        assert_eq!(records, &folded[0]);
    }
    assert_eq!(folded[0][0].violation_count, 3);
    assert_eq!(folded[0][0].latest_activity_at, at(20));
}

#[tokio::test]
async fn gated_policies_cannot_be_deleted() {
    let world = World::new().await;
    let policy = world.coverage_policy().await;
    world.stage(true, &policy).await;

    let blocked = world.service.delete_policy(&policy).await.unwrap();
    assert_eq!(blocked.status.status_code(), 409);
    assert_eq!(blocked.stages, vec!["production".to_owned()]);
    assert!(world.store.find_policy(&policy).await.unwrap().is_some());

    world.stage(false, &policy).await;
    let deleted = world.service.delete_policy(&policy).await.unwrap();
    assert_eq!(deleted.status.status_code(), 200);
    assert!(world.service.policy(&policy).await.is_err());
    assert!(world.service.delete_policy(&policy).await.is_err());
}

#[tokio::test]
async fn journal_backed_history_feeds_insights() {
    let path = std::env::temp_dir().join(format!("gate-journal-{}.jsonl", uuid::Uuid::new_v4()));
    let journal = Arc::new(FileActivityJournal::open(path.clone()).await.unwrap());
    let world = World::with_backends({
        let journal = journal.clone();
        move |backends| backends.with_activity_log(journal)
    })
    .await;
    let policy = world.coverage_policy().await;
    let gate_run = world.gate_run("run-1").await;

    world.validate(&policy, &gate_run).await;
    world.validate(&policy, &gate_run).await;

    assert_eq!(world.store.activity_count().await, 0);
    assert_eq!(journal.read_all().await.unwrap().len(), 2);

    let insights = world.service.insights(&team()).await.unwrap();
    assert_eq!(insights[0].insights[0].violation_count, 2);

    drop(world);
    drop(journal);
    tokio::fs::remove_file(&path).await.ok();
}
