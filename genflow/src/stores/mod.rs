//! Durable state behind the pipeline: scratch checkpoints, artifacts and
//! progress records.
//!
//! Each store is a narrow async trait so hosted backends can be plugged in;
//! the in-memory implementations back tests and single-process deployments.

mod artifact;
mod checkpoint;
mod progress;

#[cfg(test)]
pub use progress::MockProgressReporter;

pub use artifact::{artifact_digest, ArtifactStore, InMemoryArtifactStore};
pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use progress::{InMemoryProgressReporter, ProgressReporter};
