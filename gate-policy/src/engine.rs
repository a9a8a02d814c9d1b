//! Rule evaluator seam and engine errors.

use async_trait::async_trait;
use gate_store::StoreError;
use thiserror::Error;

use crate::contracts::EvaluationRequest;
use crate::decision::EvaluationVerdict;

/// Errors surfaced by the policy engine.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A referenced entity does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound {
        /// Entity kind, e.g. `policy`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// Policy payload failed validation.
    #[error("invalid policy request: {source}")]
    InvalidPolicy {
        /// Underlying validation error.
        #[from]
        source: gate_primitives::Error,
    },
    /// Persistence or directory failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The rule evaluator could not produce a verdict.
    #[error("rule evaluator failure: {reason}")]
    Evaluator {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
}

impl PolicyError {
    /// Convenience constructor for missing entities.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Convenience constructor for evaluator failures.
    #[must_use]
    pub fn evaluator(reason: impl Into<String>) -> Self {
        Self::Evaluator {
            reason: reason.into(),
        }
    }
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Client for the external rule-evaluation engine.
///
/// Implementations only transport requests; the rule language lives in the
/// remote engine.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Evaluates the rules in `request` against its input document.
    async fn evaluate(&self, request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict>;
}
