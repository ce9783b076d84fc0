use std::time::Duration;

/// Two-step reconnect backoff.
///
/// Consecutive failures up to `failure_threshold` wait `short_delay`; every
/// failure past the threshold waits `long_delay`. A successful open resets
/// the failure count, which brings the delay back to `short_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub short_delay: Duration,
    pub long_delay: Duration,
    pub failure_threshold: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            short_delay: Duration::from_secs(1),
            long_delay: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the reconnect that follows `consecutive_failures`
    /// failures (1-based).
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures > self.failure_threshold {
            self.long_delay
        } else {
            self.short_delay
        }
    }
}
