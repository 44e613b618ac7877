//! # Genflow
//!
//! Staged, resumable generation of project artifacts.
//!
//! Each artifact kind is produced by a pipeline of named stages. A caller
//! (usually a scheduler) repeatedly *activates* a pipeline instance; every
//! activation executes exactly one stage and returns the next one, so
//! long-running work survives restarts and time-limited execution slots.
//!
//! - **Source**: the project's retained files, concatenated into one document
//! - **Specification**: one analysis summary per file, one file per activation
//! - **Blueprint**: a templated architecture summary, optionally refined by
//!   the analysis service
//!
//! Scratch data lives in a [`stores::CheckpointStore`], output text in an
//! [`stores::ArtifactStore`], and externally visible status in a
//! [`stores::ProgressReporter`] guarded by optimistic versioning.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genflow::prelude::*;
//!
//! let engine = PipelineEngine::new(ports, GeneratorConfig::from_env()?);
//! let instance = PipelineInstance::new("dev@example.com", "acme", "widgets", ArtifactKind::Source);
//!
//! let mut next = engine.advance(&instance, None).await?;
//! while next != Stage::Complete {
//!     next = engine.advance(&instance, Some(next.as_str())).await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analysis;
pub mod config;
pub mod core;
pub mod errors;
pub mod generators;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod stages;
pub mod stores;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{AnalysisClient, Capability};
    pub use crate::config::{FailurePolicy, GeneratorConfig};
    pub use crate::core::{
        ArtifactKind, GeneratorState, PipelineInstance, ProjectResource, Stage, TaskStatus,
    };
    pub use crate::errors::{GeneratorError, ProcessingError, ProgressError, Result};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{ActivationDriver, DriveReport, PipelineEngine, ProgressMode};
    pub use crate::source::{SourceFile, SourceProvider};
    pub use crate::stages::{PipelinePorts, StageContext, StageHandler, StageOutcome};
    pub use crate::stores::{ArtifactStore, CheckpointStore, ProgressReporter};
}

/// Version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
