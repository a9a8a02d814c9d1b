//! Policy evaluation and violation tracking for delivery pipeline gates.
//!
//! Depend on this crate via `cargo add policy-gates`. It bundles the workspace
//! crates behind feature flags so deployments can leave out the HTTP adapters
//! or configuration loading when they wire their own.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use gate_primitives as primitives;

/// Persistence and pipeline-directory boundaries (enabled by `store` feature).
#[cfg(feature = "store")]
pub use gate_store as store;

/// Validation, violation aggregation, and insights (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use gate_policy as policy;

/// Repository and rule-evaluator HTTP clients (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use gate_adapters as adapters;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use gate_config as config;

/// Structured logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use gate_telemetry as telemetry;
