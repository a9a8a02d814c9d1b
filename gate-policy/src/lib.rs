//! Governance policy evaluation for delivery pipeline gates.
//!
//! The crate is organised around three operations:
//!
//! - [`validation::PolicyValidator`] evaluates every configured definition of
//!   a policy against one component version and records a
//!   [`PolicyActivity`](gate_primitives::PolicyActivity).
//! - [`violations::ViolationAggregator`] folds the failing activities behind
//!   each gated stage into keyed [`violations::ViolationRecord`]s.
//! - [`insights::InsightsAggregator`] summarises failing activities per policy
//!   over a trailing window.
//!
//! [`service::PolicyService`] ties these together with the policy lifecycle.

#![warn(missing_docs, clippy::pedantic)]

pub mod clock;
pub mod contracts;
pub mod decision;
pub mod engine;
pub mod insights;
pub mod integrations;
pub mod registry;
pub mod service;
pub mod validation;
pub mod violations;

mod stages;

#[cfg(test)]
mod fixtures;

pub use clock::{Clock, FixedClock, SystemClock};
pub use contracts::{ComponentTarget, EvaluationRequest, ValidationRequest};
pub use decision::EvaluationVerdict;
pub use engine::{PolicyError, PolicyResult, RuleEvaluator};
pub use insights::{ActivityInsight, InsightsAggregator, PolicyInsight};
pub use integrations::{DataFetcher, FetchedDocument};
pub use registry::{DefinitionRegistry, EvaluationInput};
pub use service::{
    Backends, DeletionResponse, DeletionStatus, EngineSettings, PolicyOverview, PolicyService,
};
pub use validation::PolicyValidator;
pub use violations::{
    RecordLabels, ViolationAggregator, ViolationKey, ViolationLedger, ViolationRecord,
};
