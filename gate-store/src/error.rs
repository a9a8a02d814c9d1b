//! Error types for the storage subsystem.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Errors emitted by storage components.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound {
        /// Entity kind, e.g. `policy`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// An entity with the same identifier already exists.
    #[error("{entity} `{id}` already exists")]
    Duplicate {
        /// Entity kind, e.g. `policy`.
        entity: &'static str,
        /// Conflicting identifier.
        id: String,
    },
    /// Underlying I/O failure while reading or writing journal files.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
    /// Serialization or deserialization error.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
    /// Storage backend reported an application error.
    #[error("storage backend error: {reason}")]
    Backend {
        /// Human-readable reason describing the failure.
        reason: String,
    },
}

impl StoreError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Helper to construct not-found errors.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
