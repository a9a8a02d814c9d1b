//! Verdicts returned by rule evaluators.

use gate_primitives::{DefinitionResult, PolicyDefinition, Violation};
use serde::{Deserialize, Serialize};

/// Pass/fail outcome for one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    valid: bool,
    #[serde(default)]
    violations: Vec<Violation>,
}

impl EvaluationVerdict {
    /// Returns a passing verdict.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
        }
    }

    /// Returns a failing verdict carrying the supplied violations.
    #[must_use]
    pub fn fail(violations: Vec<Violation>) -> Self {
        Self {
            valid: false,
            violations,
        }
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

    /// Maps the verdict into a persisted result for `definition`.
    #[must_use]
    pub fn into_result(self, definition: &PolicyDefinition) -> DefinitionResult {
        DefinitionResult::from_verdict(
            definition.id.clone(),
            &definition.name,
            self.valid,
            self.violations,
        )
    }
}
