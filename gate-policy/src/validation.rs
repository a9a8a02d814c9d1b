//! Policy validation against a single component version.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gate_primitives::{DefinitionResult, PolicyActivity, PolicyConfig, PolicyDefinition};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::contracts::{ComponentTarget, EvaluationRequest, ValidationRequest};
use crate::engine::{PolicyError, PolicyResult, RuleEvaluator};
use crate::registry::{DefinitionRegistry, EvaluationInput};
use crate::service::Backends;

const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Evaluates every configured definition of a policy and records the outcome.
#[derive(Clone)]
pub struct PolicyValidator {
    backends: Backends,
    registry: DefinitionRegistry,
    evaluator: Arc<dyn RuleEvaluator>,
    evaluation_timeout: Duration,
}

impl fmt::Debug for PolicyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyValidator")
            .field("registry", &self.registry)
            .field("evaluation_timeout", &self.evaluation_timeout)
            .finish_non_exhaustive()
    }
}

impl PolicyValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(
        backends: Backends,
        registry: DefinitionRegistry,
        evaluator: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            backends,
            registry,
            evaluator,
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
        }
    }

    /// Overrides the per-definition rule evaluation timeout.
    #[must_use]
    pub fn with_evaluation_timeout(mut self, evaluation_timeout: Duration) -> Self {
        self.evaluation_timeout = evaluation_timeout;
        self
    }

    /// Validates the policy named by `request` and appends the resulting
    /// activity to the activity log.
    ///
    /// Data-fetch and evaluator failures never abort validation; they become
    /// failing results for the affected definition.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the policy does not exist and
    /// [`PolicyError::Store`] when the catalog or activity log fails.
    pub async fn validate(&self, request: ValidationRequest) -> PolicyResult<PolicyActivity> {
        let ValidationRequest {
            policy_id,
            component_activity_id,
            target,
        } = request;

        let policy = self
            .backends
            .policies
            .find_policy(&policy_id)
            .await?
            .ok_or_else(|| PolicyError::not_found("policy", &policy_id))?;

        let mut builder = PolicyActivity::builder(
            policy.id().clone(),
            component_activity_id,
            self.backends.clock.now(),
        )
        .team(policy.team_id().cloned());

        for config in policy.definitions().iter().filter(|config| config.has_rules()) {
            if let Some(result) = self.evaluate_config(config, &target).await? {
                builder.push_result(result);
            }
        }

        let activity = builder.build();
        self.backends.activities.append_activity(&activity).await?;

        info!(
            policy_id = %activity.policy_id(),
            component_activity_id = %activity.component_activity_id(),
            component_id = %target.component_id,
            version = %target.version,
            valid = activity.is_valid(),
            results = activity.results().len(),
            failed = activity.failed_count(),
            "policy validated"
        );
        Ok(activity)
    }

    async fn evaluate_config(
        &self,
        config: &PolicyConfig,
        target: &ComponentTarget,
    ) -> PolicyResult<Option<DefinitionResult>> {
        let Some(definition) = self
            .backends
            .catalog
            .find_definition(&config.definition_id)
            .await?
        else {
            warn!(definition_id = %config.definition_id, "configured definition missing from catalog; skipping");
            return Ok(None);
        };

        let Some(kind) = definition.kind() else {
            debug!(definition = %definition.name, key = %definition.key, "unrecognised definition key; skipping");
            return Ok(None);
        };

        let result = match self.registry.gather(kind, target).await {
            EvaluationInput::Skip => return Ok(None),
            EvaluationInput::NoData => {
                debug!(definition = %definition.name, component_id = %target.component_id, "no data for definition");
                DefinitionResult::no_data(definition.id.clone(), &definition.name)
            }
            EvaluationInput::Document(data) => {
                let request = EvaluationRequest::new(&definition, config.rules.clone(), data);
                self.evaluate(&definition, &request).await
            }
        };
        Ok(Some(result))
    }

    async fn evaluate(
        &self,
        definition: &PolicyDefinition,
        request: &EvaluationRequest,
    ) -> DefinitionResult {
        let outcome = match timeout(self.evaluation_timeout, self.evaluator.evaluate(request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(PolicyError::evaluator(format!(
                "evaluation exceeded {}ms",
                self.evaluation_timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(verdict) => verdict.into_result(definition),
            Err(err) => {
                warn!(definition = %definition.name, error = %err, "rule evaluation failed");
                DefinitionResult::no_data(definition.id.clone(), &definition.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::fixtures::{
        Harness, ThresholdEvaluator, UnreachableEvaluator, absent, definition_id, draft, present,
        registry, rule, team,
    };
    use crate::integrations::{DataFetcher, FetchedDocument};
    use async_trait::async_trait;
    use gate_primitives::{
        ComponentActivityId, ComponentId, DefinitionId, DefinitionKind, NO_DATA_MESSAGE, Policy,
        PolicyConfig, PolicyDefinition, PolicyDraft, PolicyId,
    };
    use gate_store::{ActivityLog, PolicyStore};
    use serde_json::json;

    async fn store_policy(harness: &Harness, id: &str, policy_draft: PolicyDraft) -> PolicyId {
        let id = PolicyId::new(id).unwrap();
        let policy = Policy::team(id.clone(), policy_draft, harness.clock.now()).unwrap();
        harness.store.insert_policy(policy).await.unwrap();
        id
    }

    fn request(policy_id: &PolicyId, activity: &str) -> ValidationRequest {
        ValidationRequest::new(
            policy_id.clone(),
            ComponentActivityId::new(activity).unwrap(),
            ComponentId::new("cmp-1").unwrap(),
            "1.0.0",
        )
    }

    #[tokio::test]
    async fn coverage_below_threshold_fails() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-cov",
            draft(
                "coverage",
                vec![(
                    DefinitionKind::UnitTests,
                    vec![rule("unit-test coverage", "GREATER_THAN_OR_EQUAL", "80")],
                )],
            ),
        )
        .await;
        let validator = PolicyValidator::new(
            harness.backends.clone(),
            DefinitionRegistry::new(
                absent(),
                present(json!({"unit-test coverage": 40})),
                absent(),
                absent(),
            ),
            Arc::new(ThresholdEvaluator),
        );

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();

        assert!(!activity.is_valid());
        assert_eq!(activity.team_id(), Some(&team()));
        assert_eq!(activity.results().len(), 1);
        let result = &activity.results()[0];
        assert!(!result.is_valid());
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].metric, "unit-test coverage");
        assert_eq!(harness.store.activity_count().await, 1);
    }

    #[tokio::test]
    async fn passing_rules_yield_valid_activity() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-pass",
            draft(
                "coverage",
                vec![(DefinitionKind::UnitTests, vec![rule("coverage", ">=", "30")])],
            ),
        )
        .await;
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(ThresholdEvaluator));

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert!(activity.is_valid());
        assert!(activity.results()[0].violations().is_empty());
    }

    #[tokio::test]
    async fn missing_policy_is_not_found() {
        let harness = Harness::new();
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(ThresholdEvaluator));
        let err = validator
            .validate(request(&PolicyId::new("ghost").unwrap(), "ca-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::NotFound { entity: "policy", .. }));
        assert_eq!(harness.store.activity_count().await, 0);
    }

    #[tokio::test]
    async fn absent_documents_fail_with_synthesized_violation() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-sca",
            draft(
                "quality",
                vec![(DefinitionKind::StaticCodeAnalysis, vec![rule("bugs", "<=", "0")])],
            ),
        )
        .await;
        let validator = PolicyValidator::new(
            harness.backends.clone(),
            DefinitionRegistry::new(absent(), absent(), absent(), absent()),
            Arc::new(ThresholdEvaluator),
        );

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        let result = &activity.results()[0];
        assert!(!result.is_valid());
        assert_eq!(result.violations()[0].metric, "static code analysis");
        assert_eq!(result.violations()[0].message, NO_DATA_MESSAGE);
    }

    #[tokio::test]
    async fn empty_artifact_summary_skips_definition() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-cve",
            draft(
                "cve",
                vec![
                    (DefinitionKind::CveSafelist, vec![rule("cve", "==", "none")]),
                    (DefinitionKind::UnitTests, vec![rule("coverage", ">=", "10")]),
                ],
            ),
        )
        .await;
        let validator = PolicyValidator::new(
            harness.backends.clone(),
            DefinitionRegistry::new(
                absent(),
                present(json!({"coverage": 90})),
                absent(),
                present(json!({"artifacts": []})),
            ),
            Arc::new(ThresholdEvaluator),
        );

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert_eq!(activity.results().len(), 1);
        assert_eq!(
            activity.results()[0].definition_id(),
            &definition_id(DefinitionKind::UnitTests)
        );
        assert!(activity.is_valid());
    }

    struct StalledFetcher;

    #[async_trait]
    impl DataFetcher for StalledFetcher {
        async fn fetch(&self, _target: &ComponentTarget) -> FetchedDocument {
            tokio::time::sleep(Duration::from_secs(60)).await;
            FetchedDocument::Present(json!({"artifacts": []}))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_artifact_summary_fails_the_gate() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-cve-only",
            draft(
                "cve",
                vec![(DefinitionKind::CveSafelist, vec![rule("cve", "==", "none")])],
            ),
        )
        .await;
        let validator = PolicyValidator::new(
            harness.backends.clone(),
            DefinitionRegistry::new(absent(), absent(), absent(), Arc::new(StalledFetcher))
                .with_fetch_timeout(Duration::from_millis(50)),
            Arc::new(ThresholdEvaluator),
        );

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert!(!activity.is_valid());
        assert_eq!(activity.results().len(), 1);
        let result = &activity.results()[0];
        assert_eq!(result.definition_id(), &definition_id(DefinitionKind::CveSafelist));
        assert_eq!(result.violations()[0].message, NO_DATA_MESSAGE);
    }

    #[tokio::test]
    async fn unknown_keys_and_orphaned_configs_are_skipped() {
        let harness = Harness::new();
        harness
            .store
            .seed_definition(PolicyDefinition {
                id: DefinitionId::new("def-licence").unwrap(),
                name: "licence scan".into(),
                key: "licence_scan".into(),
                description: None,
                order: 9,
            })
            .await;
        let mut policy_draft = draft(
            "mixed",
            vec![(DefinitionKind::StaticCodeAnalysis, vec![rule("bugs", ">=", "1")])],
        );
        policy_draft.definitions.push(PolicyConfig::new(
            DefinitionId::new("def-licence").unwrap(),
            vec![rule("licence", "==", "MIT")],
        ));
        policy_draft.definitions.push(PolicyConfig::new(
            DefinitionId::new("def-removed").unwrap(),
            vec![rule("x", "==", "y")],
        ));
        let policy_id = store_policy(&harness, "p-mixed", policy_draft).await;
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(ThresholdEvaluator));

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert_eq!(activity.results().len(), 1);
        assert!(activity.is_valid());
    }

    #[tokio::test]
    async fn evaluator_failures_become_failing_results() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-down",
            draft(
                "down",
                vec![
                    (DefinitionKind::StaticCodeAnalysis, vec![rule("bugs", "<=", "0")]),
                    (DefinitionKind::PackageSafelist, vec![rule("packages", "<=", "100")]),
                ],
            ),
        )
        .await;
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(UnreachableEvaluator));

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert_eq!(activity.results().len(), 2);
        assert_eq!(activity.failed_count(), 2);
        assert!(
            activity
                .results()
                .iter()
                .all(|result| !result.violations().is_empty())
        );
    }

    struct SlowEvaluator;

    #[async_trait]
    impl RuleEvaluator for SlowEvaluator {
        async fn evaluate(
            &self,
            _request: &EvaluationRequest,
        ) -> PolicyResult<crate::decision::EvaluationVerdict> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(crate::decision::EvaluationVerdict::pass())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn evaluator_timeouts_become_failing_results() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-slow",
            draft(
                "slow",
                vec![(DefinitionKind::UnitTests, vec![rule("coverage", ">=", "10")])],
            ),
        )
        .await;
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(SlowEvaluator))
                .with_evaluation_timeout(Duration::from_millis(100));

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        assert!(!activity.is_valid());
        assert_eq!(activity.results()[0].violations().len(), 1);
    }

    #[tokio::test]
    async fn results_follow_configured_order() {
        let harness = Harness::new();
        let policy_id = store_policy(
            &harness,
            "p-order",
            draft(
                "order",
                vec![
                    (DefinitionKind::PackageSafelist, vec![rule("packages", "<=", "1")]),
                    (DefinitionKind::StaticCodeAnalysis, vec![rule("bugs", "<=", "1")]),
                    (DefinitionKind::UnitTests, vec![]),
                ],
            ),
        )
        .await;
        let validator =
            PolicyValidator::new(harness.backends.clone(), registry(), Arc::new(ThresholdEvaluator));

        let activity = validator.validate(request(&policy_id, "ca-1")).await.unwrap();
        let order: Vec<_> = activity
            .results()
            .iter()
            .map(|result| result.definition_id().clone())
            .collect();
        assert_eq!(
            order,
            vec![
                definition_id(DefinitionKind::PackageSafelist),
                definition_id(DefinitionKind::StaticCodeAnalysis)
            ]
        );

        let stored = harness
            .store
            .activities_for_component_activity(&ComponentActivityId::new("ca-1").unwrap(), true)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }
}
