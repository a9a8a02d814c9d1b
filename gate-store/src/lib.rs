//! Storage boundaries for policy gates.
//!
//! The engine never owns persisted data: it reads and writes through the
//! traits in [`repository`] and consults pipeline state through
//! [`directory::DeliveryDirectory`]. In-memory and file-backed implementations
//! are provided for tests, the CLI, and single-node deployments.

#![warn(missing_docs, clippy::pedantic)]

pub mod directory;
pub mod journal;
pub mod repository;
pub mod snapshot;
pub mod volatile;

mod error;

pub use directory::{DeliveryDirectory, InMemoryDirectory};
pub use error::{StoreError, StoreResult};
pub use journal::FileActivityJournal;
pub use repository::{ActivityLog, DefinitionCatalog, PolicyStore};
pub use snapshot::StateSnapshot;
pub use volatile::InMemoryStore;
