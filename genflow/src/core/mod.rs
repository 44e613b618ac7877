//! Core types: pipeline instances, stages and progress records.

mod instance;
mod stage;
mod state;

pub use instance::{ArtifactKind, PipelineInstance, ProjectResource, ResourceAccess};
pub use stage::{Stage, UnknownStageError};
pub use state::{GeneratorState, ProgressUpdate, ResourceSyncState, SyncPoint, TaskStatus};
