//! HTTP implementations of the external collaborators used by the policy
//! engine.
//!
//! [`RepositoryFetcher`] reads quality, coverage, dependency, and artifact
//! documents from the artifact repository; [`OpaEvaluator`] submits rule sets
//! to an Open Policy Agent compatible evaluation endpoint.

#![warn(missing_docs, clippy::pedantic)]

pub mod opa;
pub mod repository;

mod error;
mod http_client;

#[cfg(test)]
mod test_server;

pub use error::{AdapterError, AdapterResult};
pub use opa::{OpaConfig, OpaEvaluator};
pub use repository::{RepositoryConfig, RepositoryFetcher};
