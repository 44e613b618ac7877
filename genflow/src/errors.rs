//! Error types for the generation pipeline.
//!
//! Errors fall into two families. A [`ProcessingError`] is recoverable: it
//! names the stage the caller should resume from. Everything else is fatal
//! and leaves the instance needing a full reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::Stage;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;

/// The main error type for pipeline activations.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Recoverable error carrying the stage to resume from.
    #[error("{0}")]
    Processing(#[from] ProcessingError),

    /// A stage handler broke the engine contract.
    #[error("Generator defect: {0}")]
    Defect(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The progress record could not be written.
    #[error("{0}")]
    Progress(#[from] ProgressError),

    /// The source provider failed.
    #[error("Source provider error: {0}")]
    Source(String),

    /// The analysis service failed or reported a non-success status.
    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    /// A checkpoint or artifact store failed.
    #[error("Store error: {0}")]
    Store(String),

    /// An outbound call exceeded its timeout.
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeneratorError {
    /// Creates a recoverable processing error.
    #[must_use]
    pub fn processing(message: impl Into<String>, resume_stage: Stage) -> Self {
        Self::Processing(ProcessingError::new(message, resume_stage))
    }

    /// Creates a source provider error.
    #[must_use]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Creates a store error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns the stage to resume from, if the error is recoverable.
    #[must_use]
    pub fn resume_stage(&self) -> Option<Stage> {
        match self {
            Self::Processing(err) => Some(err.resume_stage),
            _ => None,
        }
    }

    /// Returns true if the caller may resume without a reset.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Processing(_))
    }

    /// Converts to the dictionary reported to API callers.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert(
            "recoverable".to_string(),
            serde_json::json!(self.is_recoverable()),
        );
        if let Some(stage) = self.resume_stage() {
            map.insert("status".to_string(), serde_json::json!("paused"));
            map.insert("resume_stage".to_string(), serde_json::json!(stage));
        } else {
            map.insert("status".to_string(), serde_json::json!("failed"));
            map.insert("resume_stage".to_string(), serde_json::json!(Stage::Reset));
        }
        map
    }
}

/// Recoverable error raised by a stage; the pipeline may resume at
/// `resume_stage`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Processing error (resume at {resume_stage}): {message}")]
pub struct ProcessingError {
    /// The error message.
    pub message: String,
    /// Stage to resume from.
    pub resume_stage: Stage,
}

impl ProcessingError {
    /// Creates a new processing error.
    #[must_use]
    pub fn new(message: impl Into<String>, resume_stage: Stage) -> Self {
        Self {
            message: message.into(),
            resume_stage,
        }
    }
}

/// Outcomes of a failed progress write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    /// The progress record vanished.
    #[error("Progress record not found: {key}")]
    NotFound {
        /// Storage key of the record.
        key: String,
    },

    /// The record is in an unrecoverable error state.
    #[error("Progress record locked in error state: {key}")]
    Locked {
        /// Storage key of the record.
        key: String,
    },

    /// A concurrent writer changed the record.
    #[error("Progress record conflict for {key}: expected version {expected:?}, found {actual}")]
    Conflict {
        /// Storage key of the record.
        key: String,
        /// Version the writer observed.
        expected: Option<u64>,
        /// Version currently stored.
        actual: u64,
    },

    /// Any other failure.
    #[error("Progress store failure: {0}")]
    Other(String),
}

impl ProgressError {
    /// Returns true for the outcomes that forced processing may swallow.
    #[must_use]
    pub fn is_consistency_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Locked { .. } | Self::Conflict { .. }
        )
    }
}

/// Error returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Analysis capability '{capability}' failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
pub struct AnalysisError {
    /// Capability that was called.
    pub capability: String,
    /// HTTP or payload status, when known.
    pub status: Option<u16>,
    /// The error message.
    pub message: String,
}

impl AnalysisError {
    /// Creates a new analysis error.
    #[must_use]
    pub fn new(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
