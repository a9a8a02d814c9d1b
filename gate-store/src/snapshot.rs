//! Serializable state used to seed the in-memory backends.

use std::path::Path;

use gate_primitives::{
    Component, ComponentActivity, ComponentVersion, Pipeline, Policy, PolicyActivity,
    PolicyDefinition, Stage,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ActivityLog, InMemoryDirectory, InMemoryStore, PolicyStore, StoreResult};

/// Complete snapshot of catalog, policy, activity, and pipeline state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Policy definition catalog.
    #[serde(default)]
    pub definitions: Vec<PolicyDefinition>,
    /// Stored policies.
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Previously recorded policy activities.
    #[serde(default)]
    pub policy_activities: Vec<PolicyActivity>,
    /// Delivery pipelines.
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
    /// Pipeline stages.
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Components.
    #[serde(default)]
    pub components: Vec<Component>,
    /// Component versions.
    #[serde(default)]
    pub versions: Vec<ComponentVersion>,
    /// Component activities.
    #[serde(default)]
    pub component_activities: Vec<ComponentActivity>,
}

impl StateSnapshot {
    /// Reads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Propagates I/O and deserialization errors.
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let data = tokio::fs::read(path.as_ref()).await?;
        let snapshot: Self = serde_json::from_slice(&data)?;
        info!(
            path = %path.as_ref().display(),
            policies = snapshot.policies.len(),
            pipelines = snapshot.pipelines.len(),
            components = snapshot.components.len(),
            "state snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Builds in-memory backends populated with the snapshot contents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`](crate::StoreError::Duplicate) when the
    /// snapshot lists the same policy twice.
    pub async fn hydrate(self) -> StoreResult<(InMemoryStore, InMemoryDirectory)> {
        let Self {
            definitions,
            policies,
            policy_activities,
            pipelines,
            stages,
            components,
            versions,
            component_activities,
        } = self;

        let store = InMemoryStore::with_definitions(definitions);
        for policy in policies {
            store.insert_policy(policy).await?;
        }
        for activity in &policy_activities {
            store.append_activity(activity).await?;
        }

        let directory = InMemoryDirectory::new();
        for pipeline in pipelines {
            directory.insert_pipeline(pipeline).await;
        }
        for stage in stages {
            directory.upsert_stage(stage).await;
        }
        for component in components {
            directory.insert_component(component).await;
        }
        for version in versions {
            directory.insert_version(version).await;
        }
        for activity in component_activities {
            directory.record_activity(activity).await;
        }

        Ok((store, directory))
    }
}
