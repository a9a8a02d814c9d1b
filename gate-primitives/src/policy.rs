//! Policies and their configured definitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{DefinitionId, Error, PolicyId, Result, TeamId};

/// Opaque rule specification passed verbatim to the rule evaluator.
pub type RuleSpec = BTreeMap<String, String>;

/// Visibility of a policy.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Owned by and visible to a single team.
    #[default]
    Team,
    /// Visible to every team.
    Global,
}

/// Rules configured against one policy definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Catalog definition the rules apply to.
    pub definition_id: DefinitionId,
    /// Rule specifications, evaluated together.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl PolicyConfig {
    /// Creates a configuration for the supplied definition.
    #[must_use]
    pub fn new(definition_id: DefinitionId, rules: Vec<RuleSpec>) -> Self {
        Self {
            definition_id,
            rules,
        }
    }

    /// Returns true when at least one rule is configured.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }
}

/// External-facing policy payload used for create and update requests.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyDraft {
    /// Display name.
    pub name: String,
    /// Owning team; required for team-scoped writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// Configured definitions in evaluation order.
    #[serde(default)]
    pub definitions: Vec<PolicyConfig>,
}

/// Persisted governance policy.
///
/// Configurations without rules are dropped whenever a policy is built or
/// deserialized, so every stored config has at least one rule.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    id: PolicyId,
    name: String,
    scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    team_id: Option<TeamId>,
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "configs_with_rules")]
    definitions: Vec<PolicyConfig>,
}

impl Policy {
    /// Builds a team-scoped policy from a draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] when the name is blank or the draft has
    /// no owning team.
    pub fn team(id: PolicyId, draft: PolicyDraft, created_at: DateTime<Utc>) -> Result<Self> {
        let PolicyDraft {
            name,
            team_id,
            definitions,
        } = draft;
        let team_id =
            team_id.ok_or_else(|| Error::invalid_policy("team policies require a team id"))?;
        Self::assemble(id, name, Scope::Team, Some(team_id), created_at, definitions)
    }

    /// Builds a global policy from a draft. Any team on the draft is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] when the name is blank.
    pub fn global(id: PolicyId, draft: PolicyDraft, created_at: DateTime<Utc>) -> Result<Self> {
        let PolicyDraft {
            name,
            team_id: _,
            definitions,
        } = draft;
        Self::assemble(id, name, Scope::Global, None, created_at, definitions)
    }

    /// Applies a draft to an existing policy, keeping its identity, creation
    /// time, and global scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] when the revised policy would be
    /// invalid.
    pub fn revise(self, draft: PolicyDraft) -> Result<Self> {
        let Self {
            id,
            scope,
            team_id: current_team,
            created_at,
            ..
        } = self;
        match scope {
            Scope::Global => Self::global(id, draft, created_at),
            Scope::Team => {
                let draft = PolicyDraft {
                    team_id: draft.team_id.or(current_team),
                    ..draft
                };
                Self::team(id, draft, created_at)
            }
        }
    }

    fn assemble(
        id: PolicyId,
        name: String,
        scope: Scope,
        team_id: Option<TeamId>,
        created_at: DateTime<Utc>,
        definitions: Vec<PolicyConfig>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::invalid_policy("policy name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            scope,
            team_id,
            created_at,
            definitions: definitions.into_iter().filter(PolicyConfig::has_rules).collect(),
        })
    }

    /// Returns the policy identifier.
    #[must_use]
    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the policy scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns true for global policies.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.scope == Scope::Global
    }

    /// Returns the owning team, absent for global policies.
    #[must_use]
    pub fn team_id(&self) -> Option<&TeamId> {
        self.team_id.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the configured definitions in evaluation order.
    #[must_use]
    pub fn definitions(&self) -> &[PolicyConfig] {
        &self.definitions
    }
}

fn configs_with_rules<'de, D>(deserializer: D) -> std::result::Result<Vec<PolicyConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let configs = Vec::<PolicyConfig>::deserialize(deserializer)?;
    Ok(configs.into_iter().filter(PolicyConfig::has_rules).collect())
}
