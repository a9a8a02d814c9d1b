//! Violation records folded from failing policy activities at gated stages.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use gate_primitives::{
    ActivityId, ComponentId, ComponentVersion, ComponentVersionId, DefinitionId, Policy,
    PolicyActivity, PolicyId, StageId, TeamId, Violation,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::PolicyResult;
use crate::service::Backends;
use crate::stages::gated_stages;

/// Identity of a violation record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ViolationKey {
    /// Failing policy.
    pub policy_id: PolicyId,
    /// Component under evaluation.
    pub component_id: ComponentId,
    /// Component version under evaluation.
    pub version_id: ComponentVersionId,
    /// Gated stage the evaluation ran at.
    pub stage_id: StageId,
}

impl ViolationKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        policy_id: PolicyId,
        component_id: ComponentId,
        version_id: ComponentVersionId,
        stage_id: StageId,
    ) -> Self {
        Self {
            policy_id,
            component_id,
            version_id,
            stage_id,
        }
    }
}

impl fmt::Display for ViolationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.policy_id, self.component_id, self.version_id, self.stage_id
        )
    }
}

/// Display names attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordLabels {
    /// Policy name.
    pub policy_name: String,
    /// Component name.
    pub component_name: String,
    /// Component version name.
    pub version_name: String,
    /// Stage name.
    pub stage_name: String,
}

/// Violations of the latest failing evaluation for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    /// Record identity.
    pub key: ViolationKey,
    /// Display names.
    #[serde(flatten)]
    pub labels: RecordLabels,
    /// Failing results of the latest activity.
    pub violation_count: usize,
    /// Violations reported by the failing results.
    pub violations: Vec<Violation>,
    /// Distinct names of the failing definitions.
    pub definition_names: BTreeSet<String>,
    /// Creation time of the latest activity folded in.
    pub latest_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Observation {
    activity_id: ActivityId,
    created_at: DateTime<Utc>,
    failed_count: usize,
    violations: Vec<Violation>,
    definition_names: Vec<String>,
}

#[derive(Debug, Default)]
struct Entry {
    labels: RecordLabels,
    observations: Vec<Observation>,
}

/// Accumulates failing activities per key and folds them into records.
///
/// Observations are sorted by `(created_at, activity id)` before folding and a
/// strictly newer timestamp resets the running state, so the result depends
/// only on the set of observations, never on the order they arrived in.
#[derive(Debug, Default)]
pub struct ViolationLedger {
    entries: BTreeMap<ViolationKey, Entry>,
}

impl ViolationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failing activity under `key`.
    ///
    /// `definition_names` are the resolved names of the activity's failing
    /// definitions.
    pub fn observe(
        &mut self,
        key: ViolationKey,
        labels: RecordLabels,
        activity: &PolicyActivity,
        definition_names: Vec<String>,
    ) {
        let entry = self.entries.entry(key).or_default();
        entry.labels = labels;
        entry.observations.push(Observation {
            activity_id: activity.id().clone(),
            created_at: activity.created_at(),
            failed_count: activity.failed_count(),
            violations: activity
                .failing_results()
                .flat_map(|result| result.violations().iter().cloned())
                .collect(),
            definition_names,
        });
    }

    /// Folds every key into its record, ordered by key.
    #[must_use]
    pub fn finish(self) -> Vec<ViolationRecord> {
        self.entries
            .into_iter()
            .filter_map(|(key, entry)| fold(key, entry))
            .collect()
    }
}

fn fold(key: ViolationKey, entry: Entry) -> Option<ViolationRecord> {
    let Entry {
        labels,
        mut observations,
    } = entry;
    observations.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.activity_id.cmp(&b.activity_id))
    });

    let mut latest: Option<DateTime<Utc>> = None;
    let mut violation_count = 0;
    let mut violations = Vec::new();
    let mut definition_names = BTreeSet::new();

    for observation in observations {
        if latest.is_none_or(|seen| observation.created_at > seen) {
            latest = Some(observation.created_at);
            violation_count = 0;
            violations.clear();
            definition_names.clear();
        }
        violation_count += observation.failed_count;
        violations.extend(observation.violations);
        definition_names.extend(observation.definition_names);
    }

    Some(ViolationRecord {
        key,
        labels,
        violation_count,
        violations,
        definition_names,
        latest_activity_at: latest?,
    })
}

/// Scans a team's gated stages and produces one record per failing
/// (policy, component, version, stage).
#[derive(Clone)]
pub struct ViolationAggregator {
    backends: Backends,
}

impl fmt::Debug for ViolationAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViolationAggregator").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Lookups {
    policies: HashMap<PolicyId, Option<Policy>>,
    definitions: HashMap<DefinitionId, Option<String>>,
    versions: HashMap<ComponentVersionId, Option<ComponentVersion>>,
}

impl ViolationAggregator {
    /// Creates an aggregator over the supplied backends.
    #[must_use]
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Computes the team's violation records.
    ///
    /// Activities referencing deleted policies or unknown component versions
    /// are skipped, as are failing definitions missing from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Store`](crate::PolicyError::Store) when a backend
    /// query fails.
    pub async fn aggregate(&self, team_id: &TeamId) -> PolicyResult<Vec<ViolationRecord>> {
        let directory = self.backends.directory.as_ref();
        let pipelines = directory.pipelines_for_team(team_id).await?;
        let stages = gated_stages(directory, &pipelines).await?;
        let components = directory.components_for_team(team_id).await?;

        let mut lookups = Lookups::default();
        let mut ledger = ViolationLedger::new();

        for component in &components {
            for stage in &stages {
                let Some(gate_run) = directory
                    .latest_gated_activity(&component.id, &stage.id)
                    .await?
                else {
                    continue;
                };

                let failing = self
                    .backends
                    .activities
                    .activities_for_component_activity(&gate_run.id, false)
                    .await?;

                for activity in failing {
                    let Some(policy) = self.policy(&mut lookups, activity.policy_id()).await?
                    else {
                        debug!(policy_id = %activity.policy_id(), "skipping activity of deleted policy");
                        continue;
                    };
                    let Some(version) = self.version(&mut lookups, &gate_run.version_id).await?
                    else {
                        debug!(version_id = %gate_run.version_id, "skipping activity of unknown version");
                        continue;
                    };

                    let mut definition_names = Vec::new();
                    for result in activity.failing_results() {
                        if let Some(name) = self
                            .definition_name(&mut lookups, result.definition_id())
                            .await?
                        {
                            definition_names.push(name);
                        }
                    }

                    let key = ViolationKey::new(
                        policy.id().clone(),
                        component.id.clone(),
                        version.id.clone(),
                        stage.id.clone(),
                    );
                    let labels = RecordLabels {
                        policy_name: policy.name().to_owned(),
                        component_name: component.name.clone(),
                        version_name: version.name.clone(),
                        stage_name: stage.name.clone(),
                    };
                    ledger.observe(key, labels, &activity, definition_names);
                }
            }
        }

        let records = ledger.finish();
        info!(team_id = %team_id, stages = stages.len(), components = components.len(), records = records.len(), "violations aggregated");
        Ok(records)
    }

    async fn policy(&self, lookups: &mut Lookups, id: &PolicyId) -> PolicyResult<Option<Policy>> {
        if let Some(cached) = lookups.policies.get(id) {
            return Ok(cached.clone());
        }
        let found = self.backends.policies.find_policy(id).await?;
        lookups.policies.insert(id.clone(), found.clone());
        Ok(found)
    }

    async fn version(
        &self,
        lookups: &mut Lookups,
        id: &ComponentVersionId,
    ) -> PolicyResult<Option<ComponentVersion>> {
        if let Some(cached) = lookups.versions.get(id) {
            return Ok(cached.clone());
        }
        let found = self.backends.directory.component_version(id).await?;
        lookups.versions.insert(id.clone(), found.clone());
        Ok(found)
    }

    async fn definition_name(
        &self,
        lookups: &mut Lookups,
        id: &DefinitionId,
    ) -> PolicyResult<Option<String>> {
        if let Some(cached) = lookups.definitions.get(id) {
            return Ok(cached.clone());
        }
        let found = self
            .backends
            .catalog
            .find_definition(id)
            .await?
            .map(|definition| definition.name);
        lookups.definitions.insert(id.clone(), found.clone());
        Ok(found)
    }
}
