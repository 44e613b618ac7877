//! Clock and timeout helpers.

mod runtime;

pub use runtime::{run_with_timeout, with_timeout, TimedResult};

/// Current time in unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_recent() {
        // 2023-11-14
        assert!(unix_now() > 1_700_000_000);
    }
}
