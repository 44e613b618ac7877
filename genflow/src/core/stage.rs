//! Stage names for every pipeline variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single step of a generation pipeline.
///
/// `Reset`, `StaticDefault` and `Complete` are shared by every variant. The
/// remaining stages belong to exactly one variant, which declares them through
/// [`crate::stages::StageHandler::stages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Force a restart from the entry stage.
    Reset,
    /// Write a placeholder artifact; entry point of every variant.
    StaticDefault,
    /// Terminal, nothing left to do.
    Complete,

    /// Record the revision of each project resource.
    SourceSyncPoints,
    /// Write one empty entry per filtered file path.
    FilePathScan,
    /// Replace the empty entries with real file contents.
    FullSourceScan,

    /// Filter the project source and queue files for summarization.
    FileFiltering,
    /// Summarize one queued file; loops until the queue is empty.
    FileSummarization,

    /// Checkpoint the filtered file list.
    FileImport,
    /// Heuristic blueprint from the dominant file extension.
    SourceLanguageScan,
    /// Ask the analysis service for a draft blueprint.
    FileScan,
    /// Gather sample code for blueprint refinement.
    SampledCode,
    /// Ask the analysis service to refine the draft blueprint.
    BuildingBlueprint,
}

impl Stage {
    /// Every known stage, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Reset,
        Self::StaticDefault,
        Self::Complete,
        Self::SourceSyncPoints,
        Self::FilePathScan,
        Self::FullSourceScan,
        Self::FileFiltering,
        Self::FileSummarization,
        Self::FileImport,
        Self::SourceLanguageScan,
        Self::FileScan,
        Self::SampledCode,
        Self::BuildingBlueprint,
    ];

    /// Returns the canonical name used in progress records and checkpoint keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reset => "Reset",
            Self::StaticDefault => "StaticDefault",
            Self::Complete => "Complete",
            Self::SourceSyncPoints => "SourceSyncPoints",
            Self::FilePathScan => "FilePathScan",
            Self::FullSourceScan => "FullSourceScan",
            Self::FileFiltering => "FileFiltering",
            Self::FileSummarization => "FileSummarization",
            Self::FileImport => "FileImport",
            Self::SourceLanguageScan => "SourceLanguageScan",
            Self::FileScan => "FileScan",
            Self::SampledCode => "SampledCode",
            Self::BuildingBlueprint => "BuildingBlueprint",
        }
    }

    /// Returns true for the stages every variant shares.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Self::Reset | Self::StaticDefault | Self::Complete)
    }

    /// Returns true if no further work remains.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stage name is not one of the known stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stage: '{0}'")]
pub struct UnknownStageError(pub String);

impl FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStageError(s.to_string()))
    }
}
