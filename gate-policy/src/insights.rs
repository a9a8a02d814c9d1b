//! Per-policy failure insights over a trailing window.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Months, Utc};
use gate_primitives::{ComponentActivityId, PolicyActivity, PolicyId, TeamId};
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::PolicyResult;
use crate::service::Backends;

/// Failure count observed for one component activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityInsight {
    /// Underlying component activity.
    pub component_activity_id: ComponentActivityId,
    /// Failing results summed across every validation of the activity.
    pub violation_count: usize,
    /// Creation time of the first validation seen in the window.
    pub created_at: DateTime<Utc>,
}

/// Failure history of one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyInsight {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Policy name.
    pub policy_name: String,
    /// Policy creation time.
    pub policy_created_at: DateTime<Utc>,
    /// One entry per distinct component activity.
    pub insights: Vec<ActivityInsight>,
}

impl PolicyInsight {
    /// Folds a failing activity in, adding to the entry of its component
    /// activity when one exists.
    pub fn record(&mut self, activity: &PolicyActivity) {
        let failed = activity.failed_count();
        match self
            .insights
            .iter_mut()
            .find(|insight| &insight.component_activity_id == activity.component_activity_id())
        {
            Some(existing) => existing.violation_count += failed,
            None => self.insights.push(ActivityInsight {
                component_activity_id: activity.component_activity_id().clone(),
                violation_count: failed,
                created_at: activity.created_at(),
            }),
        }
    }
}

/// Computes [`PolicyInsight`]s for a team.
#[derive(Clone)]
pub struct InsightsAggregator {
    backends: Backends,
    period_months: u32,
}

impl fmt::Debug for InsightsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightsAggregator")
            .field("period_months", &self.period_months)
            .finish_non_exhaustive()
    }
}

impl InsightsAggregator {
    /// Creates an aggregator looking back `period_months` months.
    #[must_use]
    pub fn new(backends: Backends, period_months: u32) -> Self {
        Self {
            backends,
            period_months,
        }
    }

    /// Returns the exclusive start of the current window.
    #[must_use]
    pub fn window_start(&self) -> DateTime<Utc> {
        self.backends
            .clock
            .now()
            .checked_sub_months(Months::new(self.period_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Aggregates the team's failing activities inside the window, ordered by
    /// policy id.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Store`](crate::PolicyError::Store) when a backend
    /// query fails.
    pub async fn insights(&self, team_id: &TeamId) -> PolicyResult<Vec<PolicyInsight>> {
        let since = self.window_start();
        let mut activities = self
            .backends
            .activities
            .activities_for_team_since(team_id, false, since)
            .await?;
        activities.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut grouped: BTreeMap<PolicyId, Option<PolicyInsight>> = BTreeMap::new();
        for activity in &activities {
            if !grouped.contains_key(activity.policy_id()) {
                let seed = self
                    .backends
                    .policies
                    .find_policy(activity.policy_id())
                    .await?
                    .map(|policy| PolicyInsight {
                        policy_id: policy.id().clone(),
                        policy_name: policy.name().to_owned(),
                        policy_created_at: policy.created_at(),
                        insights: Vec::new(),
                    });
                if seed.is_none() {
                    debug!(policy_id = %activity.policy_id(), "skipping activities of deleted policy");
                }
                grouped.insert(activity.policy_id().clone(), seed);
            }
            if let Some(Some(insight)) = grouped.get_mut(activity.policy_id()) {
                insight.record(activity);
            }
        }

        let insights: Vec<PolicyInsight> = grouped.into_values().flatten().collect();
        info!(team_id = %team_id, since = %since, activities = activities.len(), policies = insights.len(), "insights aggregated");
        Ok(insights)
    }
}
