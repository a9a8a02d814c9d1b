use futures::future::try_join_all;
use gate_primitives::{Pipeline, PolicyId, Stage};
use gate_store::DeliveryDirectory;

use crate::engine::PolicyResult;

/// Returns the stages of `pipelines` whose gate is enabled, in pipeline order.
pub(crate) async fn gated_stages(
    directory: &dyn DeliveryDirectory,
    pipelines: &[Pipeline],
) -> PolicyResult<Vec<Stage>> {
    let per_pipeline = try_join_all(
        pipelines
            .iter()
            .map(|pipeline| directory.stages_for_pipeline(&pipeline.id)),
    )
    .await?;

    Ok(per_pipeline
        .into_iter()
        .flatten()
        .filter(Stage::is_gated)
        .collect())
}

/// Returns the enabled gated stages of `pipelines` that reference `policy_id`.
pub(crate) async fn stages_referencing(
    directory: &dyn DeliveryDirectory,
    pipelines: &[Pipeline],
    policy_id: &PolicyId,
) -> PolicyResult<Vec<Stage>> {
    let mut stages = gated_stages(directory, pipelines).await?;
    stages.retain(|stage| stage.gates_policy(policy_id));
    Ok(stages)
}
