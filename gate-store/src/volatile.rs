//! In-process store backing all three persistence traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_primitives::{
    ComponentActivityId, DefinitionId, Policy, PolicyActivity, PolicyDefinition, PolicyId, Scope,
    TeamId,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::repository::{matches_component_activity, matches_team_window};
use crate::{ActivityLog, DefinitionCatalog, PolicyStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct StoreInner {
    policies: BTreeMap<PolicyId, Policy>,
    definitions: BTreeMap<DefinitionId, PolicyDefinition>,
    activities: Vec<PolicyActivity>,
}

/// Volatile store holding policies, the definition catalog, and activity
/// history in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the supplied catalog entries.
    #[must_use]
    pub fn with_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = PolicyDefinition>,
    {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.id.clone(), definition))
            .collect();
        Self {
            inner: RwLock::new(StoreInner {
                definitions,
                ..StoreInner::default()
            }),
        }
    }

    /// Adds or replaces a catalog entry. Catalog seeding happens out of band,
    /// so this is not part of [`DefinitionCatalog`].
    pub async fn seed_definition(&self, definition: PolicyDefinition) {
        let mut guard = self.inner.write().await;
        guard.definitions.insert(definition.id.clone(), definition);
    }

    /// Returns the number of recorded activities.
    #[must_use]
    pub async fn activity_count(&self) -> usize {
        self.inner.read().await.activities.len()
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn find_policy(&self, id: &PolicyId) -> StoreResult<Option<Policy>> {
        Ok(self.inner.read().await.policies.get(id).cloned())
    }

    async fn policies_by_team(&self, team_id: &TeamId) -> StoreResult<Vec<Policy>> {
        let guard = self.inner.read().await;
        Ok(guard
            .policies
            .values()
            .filter(|policy| policy.team_id() == Some(team_id))
            .cloned()
            .collect())
    }

    async fn policies_by_scope(&self, scope: Scope) -> StoreResult<Vec<Policy>> {
        let guard = self.inner.read().await;
        Ok(guard
            .policies
            .values()
            .filter(|policy| policy.scope() == scope)
            .cloned()
            .collect())
    }

    async fn insert_policy(&self, policy: Policy) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        if guard.policies.contains_key(policy.id()) {
            return Err(StoreError::Duplicate {
                entity: "policy",
                id: policy.id().to_string(),
            });
        }
        debug!(policy_id = %policy.id(), "policy inserted");
        guard.policies.insert(policy.id().clone(), policy);
        Ok(())
    }

    async fn save_policy(&self, policy: Policy) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        match guard.policies.get_mut(policy.id()) {
            Some(existing) => {
                *existing = policy;
                Ok(())
            }
            None => Err(StoreError::not_found("policy", policy.id())),
        }
    }

    async fn delete_policy(&self, id: &PolicyId) -> StoreResult<bool> {
        Ok(self.inner.write().await.policies.remove(id).is_some())
    }
}

#[async_trait]
impl DefinitionCatalog for InMemoryStore {
    async fn find_definition(&self, id: &DefinitionId) -> StoreResult<Option<PolicyDefinition>> {
        Ok(self.inner.read().await.definitions.get(id).cloned())
    }

    async fn definitions(&self) -> StoreResult<Vec<PolicyDefinition>> {
        Ok(self.inner.read().await.definitions.values().cloned().collect())
    }
}

#[async_trait]
impl ActivityLog for InMemoryStore {
    async fn append_activity(&self, activity: &PolicyActivity) -> StoreResult<()> {
        self.inner.write().await.activities.push(activity.clone());
        Ok(())
    }

    async fn activities_for_component_activity(
        &self,
        component_activity_id: &ComponentActivityId,
        valid: bool,
    ) -> StoreResult<Vec<PolicyActivity>> {
        let guard = self.inner.read().await;
        Ok(guard
            .activities
            .iter()
            .filter(|activity| matches_component_activity(activity, component_activity_id, valid))
            .cloned()
            .collect())
    }

    async fn activities_for_team_since(
        &self,
        team_id: &TeamId,
        valid: bool,
        after: DateTime<Utc>,
    ) -> StoreResult<Vec<PolicyActivity>> {
        let guard = self.inner.read().await;
        Ok(guard
            .activities
            .iter()
            .filter(|activity| matches_team_window(activity, team_id, valid, after))
            .cloned()
            .collect())
    }
}
