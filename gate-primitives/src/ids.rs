//! Identifier types.
//!
//! Identifiers are opaque strings: policies and activities are keyed by
//! generated UUIDs, while pipelines, stages, and components carry whatever the
//! owning provider assigned.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting blank input.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidId`] when the identifier is empty or
            /// whitespace-only.
            pub fn new(id: impl Into<String>) -> Result<Self> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(Error::InvalidId {
                        kind: $kind,
                        reason: "identifier cannot be empty",
                    });
                }
                Ok(Self(id))
            }

            /// Generates a random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

string_id!(
    /// Identifier of a governance policy.
    PolicyId,
    "policy"
);
string_id!(
    /// Identifier of a catalog policy definition.
    DefinitionId,
    "policy definition"
);
string_id!(
    /// Identifier of a persisted policy activity.
    ActivityId,
    "policy activity"
);
string_id!(
    /// Identifier of the team owning policies, pipelines, and components.
    TeamId,
    "team"
);
string_id!(
    /// Identifier of a delivery pipeline.
    PipelineId,
    "pipeline"
);
string_id!(
    /// Identifier of a pipeline stage.
    StageId,
    "stage"
);
string_id!(
    /// Identifier of a software component.
    ComponentId,
    "component"
);
string_id!(
    /// Identifier of a specific component version.
    ComponentVersionId,
    "component version"
);
string_id!(
    /// Identifier of a component activity (a build, release, or gate run).
    ComponentActivityId,
    "component activity"
);
