//! Testing utilities for genflow pipelines.
//!
//! This module provides:
//! - Scripted source and analysis collaborators
//! - A harness wiring an engine to in-memory stores
//! - Sample project fixtures

mod fixtures;
mod mocks;

pub use fixtures::{sample_rust_files, sample_rust_project, TestHarness};
pub use mocks::{ScriptedAnalysisClient, StaticSourceProvider};
