//! Append-only evaluation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityId, ComponentActivityId, DefinitionId, PolicyId, TeamId};

/// Message attached to violations synthesized when a definition fails without
/// the evaluator naming a reason.
pub const NO_DATA_MESSAGE: &str = "No data exists for component/version";

/// Single failing (or informational) metric reported for a definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Metric or check name.
    pub metric: String,
    /// Human-readable explanation.
    pub message: String,
    /// Whether this particular metric passed.
    pub valid: bool,
}

impl Violation {
    /// Creates a violation entry.
    #[must_use]
    pub fn new(metric: impl Into<String>, message: impl Into<String>, valid: bool) -> Self {
        Self {
            metric: metric.into(),
            message: message.into(),
            valid,
        }
    }

    /// Creates the generic violation recorded when no data backs a definition.
    #[must_use]
    pub fn no_data(metric: impl Into<String>) -> Self {
        Self::new(metric, NO_DATA_MESSAGE, false)
    }
}

/// Outcome of evaluating one configured definition.
///
/// A failing result always carries at least one violation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DefinitionResult {
    definition_id: DefinitionId,
    valid: bool,
    #[serde(default)]
    violations: Vec<Violation>,
}

impl DefinitionResult {
    /// Maps an evaluator verdict into a result.
    ///
    /// When the verdict fails without violations, a [`Violation::no_data`]
    /// entry tagged with `definition_name` is synthesized.
    #[must_use]
    pub fn from_verdict(
        definition_id: DefinitionId,
        definition_name: &str,
        valid: bool,
        mut violations: Vec<Violation>,
    ) -> Self {
        if !valid && violations.is_empty() {
            violations.push(Violation::no_data(definition_name));
        }
        Self {
            definition_id,
            valid,
            violations,
        }
    }

    /// Creates the failing result recorded when no data could be obtained.
    #[must_use]
    pub fn no_data(definition_id: DefinitionId, definition_name: &str) -> Self {
        Self::from_verdict(definition_id, definition_name, false, Vec::new())
    }

    /// Returns the evaluated definition.
    #[must_use]
    pub fn definition_id(&self) -> &DefinitionId {
        &self.definition_id
    }

    /// Returns true when the definition passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the reported violations.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

/// Immutable record of one policy evaluation against one component version.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyActivity {
    id: ActivityId,
    policy_id: PolicyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    team_id: Option<TeamId>,
    component_activity_id: ComponentActivityId,
    created_at: DateTime<Utc>,
    valid: bool,
    #[serde(default)]
    results: Vec<DefinitionResult>,
}

impl PolicyActivity {
    /// Starts building an activity for the supplied policy and component activity.
    #[must_use]
    pub fn builder(
        policy_id: PolicyId,
        component_activity_id: ComponentActivityId,
        created_at: DateTime<Utc>,
    ) -> PolicyActivityBuilder {
        PolicyActivityBuilder {
            id: ActivityId::random(),
            policy_id,
            team_id: None,
            component_activity_id,
            created_at,
            results: Vec::new(),
        }
    }

    /// Returns the activity identifier.
    #[must_use]
    pub fn id(&self) -> &ActivityId {
        &self.id
    }

    /// Returns the evaluated policy.
    #[must_use]
    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    /// Returns the team copied from the policy at evaluation time.
    #[must_use]
    pub fn team_id(&self) -> Option<&TeamId> {
        self.team_id.as_ref()
    }

    /// Returns the component activity this evaluation validated.
    #[must_use]
    pub fn component_activity_id(&self) -> &ComponentActivityId {
        &self.component_activity_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true when every result passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the per-definition results in evaluation order.
    #[must_use]
    pub fn results(&self) -> &[DefinitionResult] {
        &self.results
    }

    /// Iterates over failing results.
    pub fn failing_results(&self) -> impl Iterator<Item = &DefinitionResult> {
        self.results.iter().filter(|result| !result.is_valid())
    }

    /// Returns the number of failing results.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failing_results().count()
    }
}

/// Builder for [`PolicyActivity`].
#[derive(Debug)]
pub struct PolicyActivityBuilder {
    id: ActivityId,
    policy_id: PolicyId,
    team_id: Option<TeamId>,
    component_activity_id: ComponentActivityId,
    created_at: DateTime<Utc>,
    results: Vec<DefinitionResult>,
}

impl PolicyActivityBuilder {
    /// Overrides the generated activity identifier.
    #[must_use]
    pub fn id(mut self, id: ActivityId) -> Self {
        self.id = id;
        self
    }

    /// Sets the owning team.
    #[must_use]
    pub fn team(mut self, team_id: Option<TeamId>) -> Self {
        self.team_id = team_id;
        self
    }

    /// Appends a result.
    pub fn push_result(&mut self, result: DefinitionResult) {
        self.results.push(result);
    }

    /// Appends a result and returns the builder.
    #[must_use]
    pub fn result(mut self, result: DefinitionResult) -> Self {
        self.push_result(result);
        self
    }

    /// Finalizes the activity. Its validity is the conjunction of all results.
    #[must_use]
    pub fn build(self) -> PolicyActivity {
        let valid = self.results.iter().all(DefinitionResult::is_valid);
        PolicyActivity {
            id: self.id,
            policy_id: self.policy_id,
            team_id: self.team_id,
            component_activity_id: self.component_activity_id,
            created_at: self.created_at,
            valid,
            results: self.results,
        }
    }
}
