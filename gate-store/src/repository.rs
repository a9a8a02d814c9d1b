//! Persistence traits for policies, definitions, and policy activities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_primitives::{
    ComponentActivityId, DefinitionId, Policy, PolicyActivity, PolicyDefinition, PolicyId, Scope,
    TeamId,
};

use crate::StoreResult;

/// Policy collection.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Looks up a policy by identifier.
    async fn find_policy(&self, id: &PolicyId) -> StoreResult<Option<Policy>>;

    /// Returns every policy owned by the team.
    async fn policies_by_team(&self, team_id: &TeamId) -> StoreResult<Vec<Policy>>;

    /// Returns every policy with the supplied scope.
    async fn policies_by_scope(&self, scope: Scope) -> StoreResult<Vec<Policy>>;

    /// Inserts a new policy.
    ///
    /// Implementations return [`StoreError::Duplicate`](crate::StoreError::Duplicate)
    /// when the identifier is taken.
    async fn insert_policy(&self, policy: Policy) -> StoreResult<()>;

    /// Replaces an existing policy.
    ///
    /// Implementations return [`StoreError::NotFound`](crate::StoreError::NotFound)
    /// when no policy carries the identifier.
    async fn save_policy(&self, policy: Policy) -> StoreResult<()>;

    /// Removes a policy, returning whether anything was deleted.
    async fn delete_policy(&self, id: &PolicyId) -> StoreResult<bool>;
}

/// Read-only policy definition catalog.
#[async_trait]
pub trait DefinitionCatalog: Send + Sync {
    /// Looks up a definition by identifier.
    async fn find_definition(&self, id: &DefinitionId) -> StoreResult<Option<PolicyDefinition>>;

    /// Returns every catalog entry in unspecified order.
    async fn definitions(&self) -> StoreResult<Vec<PolicyDefinition>>;
}

/// Append-only policy activity history.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Persists a new activity. Activities are never updated afterwards.
    async fn append_activity(&self, activity: &PolicyActivity) -> StoreResult<()>;

    /// Returns activities recorded for a component activity with the given validity.
    async fn activities_for_component_activity(
        &self,
        component_activity_id: &ComponentActivityId,
        valid: bool,
    ) -> StoreResult<Vec<PolicyActivity>>;

    /// Returns a team's activities with the given validity created strictly
    /// after `after`.
    async fn activities_for_team_since(
        &self,
        team_id: &TeamId,
        valid: bool,
        after: DateTime<Utc>,
    ) -> StoreResult<Vec<PolicyActivity>>;
}

pub(crate) fn matches_component_activity(
    activity: &PolicyActivity,
    component_activity_id: &ComponentActivityId,
    valid: bool,
) -> bool {
    activity.component_activity_id() == component_activity_id && activity.is_valid() == valid
}

pub(crate) fn matches_team_window(
    activity: &PolicyActivity,
    team_id: &TeamId,
    valid: bool,
    after: DateTime<Utc>,
) -> bool {
    activity.team_id() == Some(team_id)
        && activity.is_valid() == valid
        && activity.created_at() > after
}
