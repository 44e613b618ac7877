//! Outbound-call timeouts.
//!
//! Auxiliary lookups use [`run_with_timeout`] and degrade when it reports
//! [`TimedResult::Timeout`]; bulk retrieval uses [`with_timeout`], where an
//! elapsed timeout is an error.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{GeneratorError, Result};

/// Result of a timed operation.
#[derive(Debug)]
pub enum TimedResult<T, E> {
    /// Operation completed successfully.
    Ok(T),
    /// Operation failed with an error.
    Err(E),
    /// Operation timed out.
    Timeout,
}

impl<T, E> TimedResult<T, E> {
    /// Returns true if the operation timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns the value, discarding errors and timeouts.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Err(_) | Self::Timeout => None,
        }
    }
}

/// Runs a future with a timeout, reporting the timeout as its own outcome.
pub async fn run_with_timeout<T, E, F>(duration: Duration, future: F) -> TimedResult<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => TimedResult::Ok(value),
        Ok(Err(error)) => TimedResult::Err(error),
        Err(_) => TimedResult::Timeout,
    }
}

/// Runs a future with a timeout; an elapsed timeout becomes
/// [`GeneratorError::Timeout`].
pub async fn with_timeout<T, F>(duration: Duration, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match run_with_timeout(duration, future).await {
        TimedResult::Ok(value) => Ok(value),
        TimedResult::Err(error) => Err(error),
        TimedResult::Timeout => Err(GeneratorError::Timeout {
            operation: operation.to_string(),
            seconds: duration.as_secs_f64(),
        }),
    }
}
