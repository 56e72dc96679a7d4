//! Exponential-backoff retry
//!
//! A pure decorator for fallible remote calls: attempt, sleep, double
//! the delay, try again. Knows nothing about what it wraps and never
//! swallows an error; exhaustion returns the last failure unchanged.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Retry policy for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit attempt count and initial delay
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Run `op`, retrying on failure until attempts are exhausted
    ///
    /// The delay after attempt N is `initial_delay * 2^(N-1)`. On
    /// exhaustion the final error is propagated as-is.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts.max(1) {
                        return Err(err);
                    }
                    debug!(attempt, "Attempt failed, retrying in {:?}: {}", delay, err);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
