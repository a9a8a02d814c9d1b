//! Shared error definitions for gate primitives.

use thiserror::Error;

/// Result alias used throughout the policy gate workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided identifier was rejected.
    #[error("invalid {kind} id: {reason}")]
    InvalidId {
        /// Entity the identifier belongs to.
        kind: &'static str,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },

    /// Policy draft failed validation.
    #[error("invalid policy: {reason}")]
    InvalidPolicy {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Definition key does not name a known definition kind.
    #[error("unknown policy definition key `{key}`")]
    UnknownDefinitionKey {
        /// The offending key.
        key: String,
    },
}

impl Error {
    /// Convenience constructor for policy validation failures.
    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            reason: reason.into(),
        }
    }
}
