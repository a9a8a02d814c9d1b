//! Delivery pipeline shapes supplied by external providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ComponentActivityId, ComponentId, ComponentVersionId, PipelineId, PolicyId, StageId, TeamId,
};

/// Delivery pipeline owned by a team.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline identifier.
    pub id: PipelineId,
    /// Owning team.
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
}

/// Gate configuration attached to a stage.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Whether the gate is enforced.
    pub enabled: bool,
    /// Policies evaluated by the gate.
    #[serde(default)]
    pub policies: Vec<PolicyId>,
}

/// Stage within a pipeline.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage identifier.
    pub id: StageId,
    /// Pipeline the stage belongs to.
    pub pipeline_id: PipelineId,
    /// Display name.
    pub name: String,
    /// Optional gate configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gates: Option<GateConfig>,
}

impl Stage {
    /// Returns true when the stage has an enabled gate.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.gates.as_ref().is_some_and(|gates| gates.enabled)
    }

    /// Returns true when an enabled gate on this stage references the policy.
    #[must_use]
    pub fn gates_policy(&self, policy_id: &PolicyId) -> bool {
        self.gates
            .as_ref()
            .is_some_and(|gates| gates.enabled && gates.policies.contains(policy_id))
    }
}

/// Software component moving through pipelines.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component identifier.
    pub id: ComponentId,
    /// Owning team.
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
}

/// Concrete version of a component.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ComponentVersion {
    /// Version identifier.
    pub id: ComponentVersionId,
    /// Component the version belongs to.
    pub component_id: ComponentId,
    /// Version label, e.g. `1.4.2`.
    pub name: String,
}

/// Kind of component activity recorded by the pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentActivityKind {
    /// Build execution.
    Build,
    /// Release to a stage.
    Release,
    /// Gate evaluation at a stage.
    Gates,
}

/// Pipeline event for a component version at a stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ComponentActivity {
    /// Activity identifier.
    pub id: ComponentActivityId,
    /// Component the activity belongs to.
    pub component_id: ComponentId,
    /// Version the activity targeted.
    pub version_id: ComponentVersionId,
    /// Stage the activity ran at.
    pub stage_id: StageId,
    /// Activity kind.
    pub kind: ComponentActivityKind,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
