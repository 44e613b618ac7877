//! Activation engine, progress reporting and failure tolerance.

mod driver;
mod engine;
mod failure_budget;
mod progress;


pub use driver::{ActivationDriver, DriveReport};
pub use engine::PipelineEngine;
pub use failure_budget::{AbortReason, FailureBudget};
pub use progress::ProgressMode;
