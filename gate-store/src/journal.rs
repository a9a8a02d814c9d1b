//! Durable policy activity journal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_primitives::{ComponentActivityId, PolicyActivity, TeamId};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::repository::{matches_component_activity, matches_team_window};
use crate::{ActivityLog, StoreResult};

/// File-backed activity log writing newline-delimited JSON entries.
///
/// Entries are only ever appended; queries scan the whole file.
pub struct FileActivityJournal {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileActivityJournal {
    /// Opens (or creates) a journal file at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors encountered while preparing the file.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the underlying path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every recorded activity, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates I/O and deserialization errors.
    pub async fn read_all(&self) -> StoreResult<Vec<PolicyActivity>> {
        // Hold the writer lock so a concurrent append is never read half-written.
        let _guard = self.file.lock().await;
        let data = fs::read(&self.path).await?;

        let mut activities = Vec::new();
        for chunk in data
            .split(|byte| *byte == b'\n')
            .filter(|chunk| !chunk.is_empty())
        {
            activities.push(serde_json::from_slice(chunk)?);
        }
        Ok(activities)
    }

    /// Appends the activities whose identifiers are not journaled yet and
    /// returns how many were written.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialization errors.
    pub async fn import(&self, activities: &[PolicyActivity]) -> StoreResult<usize> {
        let mut known: HashSet<_> = self
            .read_all()
            .await?
            .into_iter()
            .map(|activity| activity.id().clone())
            .collect();

        let mut written = 0;
        for activity in activities {
            if known.insert(activity.id().clone()) {
                self.append_activity(activity).await?;
                written += 1;
            }
        }
        debug!(path = %self.path.display(), written, "activities imported");
        Ok(written)
    }
}

impl std::fmt::Debug for FileActivityJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileActivityJournal")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActivityLog for FileActivityJournal {
    async fn append_activity(&self, activity: &PolicyActivity) -> StoreResult<()> {
        let mut line = serde_json::to_vec(activity)?;
        line.push(b'\n');
        let mut guard = self.file.lock().await;
        guard.write_all(&line).await?;
        guard.flush().await?;
        debug!(activity_id = %activity.id(), path = %self.path.display(), "activity journaled");
        Ok(())
    }

    async fn activities_for_component_activity(
        &self,
        component_activity_id: &ComponentActivityId,
        valid: bool,
    ) -> StoreResult<Vec<PolicyActivity>> {
        let mut activities = self.read_all().await?;
        activities.retain(|activity| {
            matches_component_activity(activity, component_activity_id, valid)
        });
        Ok(activities)
    }

    async fn activities_for_team_since(
        &self,
        team_id: &TeamId,
        valid: bool,
        after: DateTime<Utc>,
    ) -> StoreResult<Vec<PolicyActivity>> {
        let mut activities = self.read_all().await?;
        activities.retain(|activity| matches_team_window(activity, team_id, valid, after));
        Ok(activities)
    }
}
