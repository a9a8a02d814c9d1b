//! Policy lifecycle and the query surface exposed to transports.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gate_primitives::{
    Operator, Policy, PolicyActivity, PolicyDefinition, PolicyDraft, PolicyId, Scope, Stage,
    TeamId,
};
use gate_store::{
    ActivityLog, DefinitionCatalog, DeliveryDirectory, InMemoryDirectory, InMemoryStore,
    PolicyStore,
};
use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::contracts::ValidationRequest;
use crate::engine::{PolicyError, PolicyResult, RuleEvaluator};
use crate::insights::{InsightsAggregator, PolicyInsight};
use crate::registry::DefinitionRegistry;
use crate::stages::{gated_stages, stages_referencing};
use crate::validation::PolicyValidator;
use crate::violations::{ViolationAggregator, ViolationRecord};

/// Storage, directory, and time collaborators shared by every engine part.
#[derive(Clone)]
pub struct Backends {
    /// Policy collection.
    pub policies: Arc<dyn PolicyStore>,
    /// Definition catalog.
    pub catalog: Arc<dyn DefinitionCatalog>,
    /// Policy activity history.
    pub activities: Arc<dyn ActivityLog>,
    /// Pipeline, stage, and component provider.
    pub directory: Arc<dyn DeliveryDirectory>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Wires an in-memory store and directory.
    #[must_use]
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        directory: Arc<InMemoryDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policies: store.clone(),
            catalog: store.clone(),
            activities: store,
            directory,
            clock,
        }
    }

    /// Replaces the activity log.
    #[must_use]
    pub fn with_activity_log(mut self, activities: Arc<dyn ActivityLog>) -> Self {
        self.activities = activities;
        self
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Length of the insights window in months.
    pub insights_period_months: u32,
    /// Timeout applied to each rule evaluation.
    pub evaluation_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            insights_period_months: 3,
            evaluation_timeout: Duration::from_secs(10),
        }
    }
}

/// Policy together with the names of the enabled gated stages referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyOverview {
    /// The policy.
    #[serde(flatten)]
    pub policy: Policy,
    /// Referencing stage names.
    pub stages: Vec<String>,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    /// The policy was removed.
    Deleted,
    /// An enabled gate still references the policy.
    Conflict,
}

impl DeletionStatus {
    /// Returns the matching HTTP status code.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Deleted => 200,
            Self::Conflict => 409,
        }
    }
}

/// Structured result of [`PolicyService::delete_policy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionResponse {
    /// Outcome.
    pub status: DeletionStatus,
    /// Human-readable message.
    pub message: String,
    /// Names of the referencing stages on conflict.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<String>,
}

/// Entry point combining validation, aggregation, insights, and the policy
/// lifecycle.
#[derive(Debug, Clone)]
pub struct PolicyService {
    backends: Backends,
    validator: PolicyValidator,
    violations: ViolationAggregator,
    insights: InsightsAggregator,
}

impl PolicyService {
    /// Creates a service.
    #[must_use]
    pub fn new(
        backends: Backends,
        registry: DefinitionRegistry,
        evaluator: Arc<dyn RuleEvaluator>,
        settings: EngineSettings,
    ) -> Self {
        let validator = PolicyValidator::new(backends.clone(), registry, evaluator)
            .with_evaluation_timeout(settings.evaluation_timeout);
        let violations = ViolationAggregator::new(backends.clone());
        let insights = InsightsAggregator::new(backends.clone(), settings.insights_period_months);
        Self {
            backends,
            validator,
            violations,
            insights,
        }
    }

    /// Returns the definition catalog sorted by display order.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn definitions(&self) -> PolicyResult<Vec<PolicyDefinition>> {
        let mut definitions = self.backends.catalog.definitions().await?;
        definitions.sort_by_key(|definition| definition.order);
        Ok(definitions)
    }

    /// Returns the comparison operators rule specifications may use.
    #[must_use]
    pub fn operators(&self) -> &'static [Operator] {
        &Operator::ALL
    }

    /// Looks up a policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the policy does not exist.
    pub async fn policy(&self, id: &PolicyId) -> PolicyResult<Policy> {
        self.backends
            .policies
            .find_policy(id)
            .await?
            .ok_or_else(|| PolicyError::not_found("policy", id))
    }

    /// Returns the team's policies followed by every global policy, each with
    /// the enabled gated stages referencing it.
    ///
    /// # Errors
    ///
    /// Propagates store and directory failures.
    pub async fn policies_for_team(&self, team_id: &TeamId) -> PolicyResult<Vec<PolicyOverview>> {
        let directory = self.backends.directory.as_ref();
        let team_policies = self.backends.policies.policies_by_team(team_id).await?;
        let global_policies = self.backends.policies.policies_by_scope(Scope::Global).await?;

        let team_pipelines = directory.pipelines_for_team(team_id).await?;
        let team_stages = gated_stages(directory, &team_pipelines).await?;
        let all_stages = if global_policies.is_empty() {
            Vec::new()
        } else {
            let all_pipelines = directory.all_pipelines().await?;
            gated_stages(directory, &all_pipelines).await?
        };

        let overview = |policy: Policy, stages: &[Stage]| {
            let stages = stages
                .iter()
                .filter(|stage| stage.gates_policy(policy.id()))
                .map(|stage| stage.name.clone())
                .collect();
            PolicyOverview { policy, stages }
        };

        Ok(team_policies
            .into_iter()
            .filter(|policy| !policy.is_global())
            .map(|policy| overview(policy, &team_stages))
            .chain(
                global_policies
                    .into_iter()
                    .map(|policy| overview(policy, &all_stages)),
            )
            .collect())
    }

    /// Creates a team policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidPolicy`] when the draft has no team or a
    /// blank name.
    pub async fn create_policy(&self, draft: PolicyDraft) -> PolicyResult<Policy> {
        let policy = Policy::team(PolicyId::random(), draft, self.backends.clock.now())?;
        self.backends.policies.insert_policy(policy.clone()).await?;
        info!(policy_id = %policy.id(), team_id = ?policy.team_id(), "policy created");
        Ok(policy)
    }

    /// Creates a global policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidPolicy`] when the name is blank.
    pub async fn create_global_policy(&self, draft: PolicyDraft) -> PolicyResult<Policy> {
        let policy = Policy::global(PolicyId::random(), draft, self.backends.clock.now())?;
        self.backends.policies.insert_policy(policy.clone()).await?;
        info!(policy_id = %policy.id(), "global policy created");
        Ok(policy)
    }

    /// Applies `draft` to an existing policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the policy does not exist.
    pub async fn update_policy(&self, id: &PolicyId, draft: PolicyDraft) -> PolicyResult<Policy> {
        let current = self.policy(id).await?;
        let revised = current.revise(draft)?;
        self.backends.policies.save_policy(revised.clone()).await?;
        info!(policy_id = %revised.id(), "policy updated");
        Ok(revised)
    }

    /// Deletes a policy unless an enabled gate references it.
    ///
    /// Team policies are checked against the team's pipelines, global policies
    /// against every pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the policy does not exist.
    pub async fn delete_policy(&self, id: &PolicyId) -> PolicyResult<DeletionResponse> {
        let policy = self.policy(id).await?;
        let directory = self.backends.directory.as_ref();
        let pipelines = match policy.team_id() {
            Some(team_id) if !policy.is_global() => directory.pipelines_for_team(team_id).await?,
            _ => directory.all_pipelines().await?,
        };

        let referencing = stages_referencing(directory, &pipelines, id).await?;
        if !referencing.is_empty() {
            let stages: Vec<String> = referencing.into_iter().map(|stage| stage.name).collect();
            info!(policy_id = %id, stages = ?stages, "policy deletion blocked by gates");
            return Ok(DeletionResponse {
                status: DeletionStatus::Conflict,
                message: "Policy associated with gate".to_owned(),
                stages,
            });
        }

        if !self.backends.policies.delete_policy(id).await? {
            return Err(PolicyError::not_found("policy", id));
        }
        info!(policy_id = %id, "policy deleted");
        Ok(DeletionResponse {
            status: DeletionStatus::Deleted,
            message: "Policy deleted".to_owned(),
            stages: Vec::new(),
        })
    }

    /// Validates a policy against a component version.
    ///
    /// # Errors
    ///
    /// See [`PolicyValidator::validate`].
    pub async fn validate(&self, request: ValidationRequest) -> PolicyResult<PolicyActivity> {
        self.validator.validate(request).await
    }

    /// Aggregates the team's violation records.
    ///
    /// # Errors
    ///
    /// See [`ViolationAggregator::aggregate`].
    pub async fn violations(&self, team_id: &TeamId) -> PolicyResult<Vec<ViolationRecord>> {
        self.violations.aggregate(team_id).await
    }

    /// Aggregates the team's policy insights.
    ///
    /// # Errors
    ///
    /// See [`InsightsAggregator::insights`].
    pub async fn insights(&self, team_id: &TeamId) -> PolicyResult<Vec<PolicyInsight>> {
        self.insights.insights(team_id).await
    }
}
