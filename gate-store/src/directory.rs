//! Pipeline, stage, and component providers.

use async_trait::async_trait;
use gate_primitives::{
    Component, ComponentActivity, ComponentActivityKind, ComponentId, ComponentVersion,
    ComponentVersionId, Pipeline, PipelineId, Stage, StageId, TeamId,
};
use tokio::sync::RwLock;

use crate::StoreResult;

/// Read access to delivery pipeline state owned by external services.
#[async_trait]
pub trait DeliveryDirectory: Send + Sync {
    /// Returns the team's pipelines.
    async fn pipelines_for_team(&self, team_id: &TeamId) -> StoreResult<Vec<Pipeline>>;

    /// Returns every pipeline across all teams.
    async fn all_pipelines(&self) -> StoreResult<Vec<Pipeline>>;

    /// Returns the stages of a pipeline in pipeline order.
    async fn stages_for_pipeline(&self, pipeline_id: &PipelineId) -> StoreResult<Vec<Stage>>;

    /// Returns the team's components.
    async fn components_for_team(&self, team_id: &TeamId) -> StoreResult<Vec<Component>>;

    /// Returns the most recent gate activity of a component at a stage.
    async fn latest_gated_activity(
        &self,
        component_id: &ComponentId,
        stage_id: &StageId,
    ) -> StoreResult<Option<ComponentActivity>>;

    /// Looks up a component version.
    async fn component_version(
        &self,
        version_id: &ComponentVersionId,
    ) -> StoreResult<Option<ComponentVersion>>;
}

#[derive(Debug, Default)]
struct DirectoryInner {
    pipelines: Vec<Pipeline>,
    stages: Vec<Stage>,
    components: Vec<Component>,
    versions: Vec<ComponentVersion>,
    activities: Vec<ComponentActivity>,
}

/// In-memory directory used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline.
    pub async fn insert_pipeline(&self, pipeline: Pipeline) {
        self.inner.write().await.pipelines.push(pipeline);
    }

    /// Adds a stage or replaces the stage with the same identifier.
    pub async fn upsert_stage(&self, stage: Stage) {
        let mut guard = self.inner.write().await;
        match guard.stages.iter_mut().find(|existing| existing.id == stage.id) {
            Some(existing) => *existing = stage,
            None => guard.stages.push(stage),
        }
    }

    /// Registers a component.
    pub async fn insert_component(&self, component: Component) {
        self.inner.write().await.components.push(component);
    }

    /// Registers a component version.
    pub async fn insert_version(&self, version: ComponentVersion) {
        self.inner.write().await.versions.push(version);
    }

    /// Records a component activity.
    pub async fn record_activity(&self, activity: ComponentActivity) {
        self.inner.write().await.activities.push(activity);
    }
}

#[async_trait]
impl DeliveryDirectory for InMemoryDirectory {
    async fn pipelines_for_team(&self, team_id: &TeamId) -> StoreResult<Vec<Pipeline>> {
        let guard = self.inner.read().await;
        Ok(guard
            .pipelines
            .iter()
            .filter(|pipeline| &pipeline.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn all_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        Ok(self.inner.read().await.pipelines.clone())
    }

    async fn stages_for_pipeline(&self, pipeline_id: &PipelineId) -> StoreResult<Vec<Stage>> {
        let guard = self.inner.read().await;
        Ok(guard
            .stages
            .iter()
            .filter(|stage| &stage.pipeline_id == pipeline_id)
            .cloned()
            .collect())
    }

    async fn components_for_team(&self, team_id: &TeamId) -> StoreResult<Vec<Component>> {
        let guard = self.inner.read().await;
        Ok(guard
            .components
            .iter()
            .filter(|component| &component.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn latest_gated_activity(
        &self,
        component_id: &ComponentId,
        stage_id: &StageId,
    ) -> StoreResult<Option<ComponentActivity>> {
        let guard = self.inner.read().await;
        Ok(guard
            .activities
            .iter()
            .filter(|activity| {
                activity.kind == ComponentActivityKind::Gates
                    && &activity.component_id == component_id
                    && &activity.stage_id == stage_id
            })
            .max_by_key(|activity| activity.created_at)
            .cloned())
    }

    async fn component_version(
        &self,
        version_id: &ComponentVersionId,
    ) -> StoreResult<Option<ComponentVersion>> {
        let guard = self.inner.read().await;
        Ok(guard
            .versions
            .iter()
            .find(|version| &version.id == version_id)
            .cloned())
    }
}
