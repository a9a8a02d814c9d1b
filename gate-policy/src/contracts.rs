//! Request contracts for validation and rule evaluation.

use gate_primitives::{
    ComponentActivityId, ComponentId, DefinitionId, PolicyDefinition, PolicyId, RuleSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Component version a policy is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTarget {
    /// Component identifier, also used as the repository lookup path.
    pub component_id: ComponentId,
    /// Version label.
    pub version: String,
}

impl ComponentTarget {
    /// Creates a target for the supplied component and version.
    #[must_use]
    pub fn new(component_id: ComponentId, version: impl Into<String>) -> Self {
        Self {
            component_id,
            version: version.into(),
        }
    }
}

/// Request to validate a policy when a component reaches a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Policy to evaluate.
    pub policy_id: PolicyId,
    /// Component activity (gate run) being validated.
    pub component_activity_id: ComponentActivityId,
    /// Component version under evaluation.
    #[serde(flatten)]
    pub target: ComponentTarget,
}

impl ValidationRequest {
    /// Creates a validation request.
    #[must_use]
    pub fn new(
        policy_id: PolicyId,
        component_activity_id: ComponentActivityId,
        component_id: ComponentId,
        version: impl Into<String>,
    ) -> Self {
        Self {
            policy_id,
            component_activity_id,
            target: ComponentTarget::new(component_id, version),
        }
    }
}

/// Definition reference and rules handed to the rule evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePolicy {
    /// Definition identifier.
    pub id: DefinitionId,
    /// Definition key selecting the check semantics.
    pub key: String,
    /// Rules passed verbatim.
    pub rules: Vec<RuleSpec>,
}

/// Full request sent to the rule evaluator for one definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    policy: RulePolicy,
    data: Value,
}

impl EvaluationRequest {
    /// Creates a request evaluating `rules` for `definition` against `data`.
    #[must_use]
    pub fn new(definition: &PolicyDefinition, rules: Vec<RuleSpec>, data: Value) -> Self {
        Self {
            policy: RulePolicy {
                id: definition.id.clone(),
                key: definition.key.clone(),
                rules,
            },
            data,
        }
    }

    /// Returns the definition reference and rules.
    #[must_use]
    pub fn policy(&self) -> &RulePolicy {
        &self.policy
    }

    /// Returns the input document.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }
}
