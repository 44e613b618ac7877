//! Progress records and the updates applied to them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Stage;

/// Coarse status of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// A stage is running or more stages are pending.
    Processing,
    /// Nothing is running.
    #[default]
    Idle,
    /// The generator failed and must be reset.
    Error,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Idle => write!(f, "idle"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Revision marker of a source resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPoint {
    /// Commit time in unix seconds.
    pub commit_time: i64,
    /// Commit hash.
    pub commit_hash: String,
}

/// Last known revision of one project resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSyncState {
    /// Resource URI.
    pub uri: String,
    /// Revision, if it could be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_point: Option<SyncPoint>,
}

/// The externally observable progress record of one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Next stage to execute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Coarse status.
    pub status: TaskStatus,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<String>,
    /// Unix seconds of the last write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Optimistic concurrency token, bumped on every write.
    #[serde(default)]
    pub version: u64,
    /// Estimate of stages left before `Complete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_stages_remaining: Option<usize>,
    /// Stages finished since the last reset.
    #[serde(default)]
    pub processed_stages: usize,
    /// Number of child resources, such as files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_resources: Option<usize>,
    /// Per-resource sync status.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_state: Vec<ResourceSyncState>,
    /// sha256 of the last persisted artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_digest: Option<String>,
}

impl GeneratorState {
    /// Returns true if the record says the pipeline finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == Some(Stage::Complete)
    }

    /// Returns true if a processing record has not been touched for longer
    /// than `threshold_secs`.
    #[must_use]
    pub fn is_stalled(&self, now: i64, threshold_secs: i64) -> bool {
        if self.status != TaskStatus::Processing {
            return false;
        }
        match self.last_updated {
            Some(last) => last < now - threshold_secs,
            None => true,
        }
    }

    /// Applies an update, as a progress store would.
    ///
    /// Hints that the update leaves unset keep their previous value, except on
    /// a reset, which starts from an empty record.
    pub fn apply(&mut self, update: &ProgressUpdate, now: i64) {
        if update.reset {
            *self = Self {
                version: self.version,
                ..Self::default()
            };
        }
        self.status = update.status;
        if let Some(stage) = update.stage {
            self.stage = Some(stage);
        }
        if let Some(ref details) = update.status_details {
            self.status_details = Some(details.clone());
        }
        if let Some(remaining) = update.possible_stages_remaining {
            self.possible_stages_remaining = Some(remaining);
        }
        if let Some(children) = update.child_resources {
            self.child_resources = Some(children);
        }
        if let Some(ref resources) = update.resources_state {
            self.resources_state = resources.clone();
        }
        if let Some(ref digest) = update.artifact_digest {
            self.artifact_digest = Some(digest.clone());
        }
        if update.stage_finished {
            self.processed_stages += 1;
        }
        self.last_updated = Some(update.last_updated.unwrap_or(now));
        self.version += 1;
    }
}

/// A change to a progress record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// New status.
    pub status: TaskStatus,
    /// New stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// New status detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<String>,
    /// Explicit timestamp; the store uses its own clock if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Version the writer last observed; `None` creates the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    /// Remaining-stage estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_stages_remaining: Option<usize>,
    /// Child resource count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_resources: Option<usize>,
    /// Per-resource sync status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_state: Option<Vec<ResourceSyncState>>,
    /// Digest of the artifact saved in this activation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_digest: Option<String>,
    /// Clear prior hints and any error lock.
    #[serde(default)]
    pub reset: bool,
    /// Count this write as a finished stage.
    #[serde(default)]
    pub stage_finished: bool,
}

impl ProgressUpdate {
    /// Creates an update with the given status.
    #[must_use]
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A processing update.
    #[must_use]
    pub fn processing() -> Self {
        Self::new(TaskStatus::Processing)
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the status detail.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.status_details = Some(details.into());
        self
    }

    /// Sets the version the writer observed.
    #[must_use]
    pub fn expecting(mut self, version: Option<u64>) -> Self {
        self.expected_version = version;
        self
    }

    /// Sets the remaining-stage estimate.
    #[must_use]
    pub fn with_stages_remaining(mut self, remaining: usize) -> Self {
        self.possible_stages_remaining = Some(remaining);
        self
    }

    /// Marks the update as a reset.
    #[must_use]
    pub fn as_reset(mut self) -> Self {
        self.reset = true;
        self
    }
}
