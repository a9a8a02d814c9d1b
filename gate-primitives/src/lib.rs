//! Core shared types for policy gates.
//!
//! Everything the evaluation engine, the persistence boundary, and the HTTP
//! adapters exchange lives here: identifiers, policies and their definitions,
//! the immutable activity history, and the pipeline shapes consulted when
//! aggregating violations.

#![warn(missing_docs, clippy::pedantic)]

mod activity;
mod definition;
mod error;
mod ids;
mod pipeline;
mod policy;

/// Immutable evaluation history.
pub use activity::{
    DefinitionResult, NO_DATA_MESSAGE, PolicyActivity, PolicyActivityBuilder, Violation,
};
/// Definition catalog entries and the closed set of definition kinds.
pub use definition::{DataSource, DefinitionKind, Operator, PolicyDefinition};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for every entity the engine touches.
pub use ids::{
    ActivityId, ComponentActivityId, ComponentId, ComponentVersionId, DefinitionId, PipelineId,
    PolicyId, StageId, TeamId,
};
/// Delivery pipeline shapes owned by external providers.
pub use pipeline::{
    Component, ComponentActivity, ComponentActivityKind, ComponentVersion, GateConfig, Pipeline,
    Stage,
};
/// Policies, their configured definitions, and the external-facing draft.
pub use policy::{Policy, PolicyConfig, PolicyDraft, RuleSpec, Scope};
