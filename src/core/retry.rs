//! Fixed-delay retry loop around a fallible attempt.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::core::error::ExecError;

/// How many times to try and how long to pause between tries.
///
/// The count is total attempts, not retries after a first try: a policy of
/// 3 invokes the attempt at most 3 times. Every failure kind is retryable
/// here, including bulkhead rejections and timeouts; distinguishing them
/// is the fallback handler's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    /// One attempt, no delay: plain execution.
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl RetryPolicy {
    /// Build a policy of `attempts` total tries with `delay_millis` between
    /// failures. Counts below 1 are raised to 1.
    #[must_use]
    pub fn new(attempts: u32, delay_millis: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            delay: Duration::from_millis(delay_millis),
        }
    }

    /// Total attempts this policy allows.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause between failed attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Drive `attempt` (called with the 1-based attempt number) until it
    /// succeeds or the count is exhausted, sleeping `delay` between
    /// failures. Intermediate failures are suppressed; the last one is
    /// returned.
    ///
    /// # Errors
    ///
    /// The failure of the final attempt.
    pub fn run<T>(
        &self,
        mut attempt: impl FnMut(u32) -> Result<T, ExecError>,
    ) -> Result<T, ExecError> {
        let mut number = 0;
        loop {
            number += 1;
            match attempt(number) {
                Ok(value) => return Ok(value),
                Err(err) if number >= self.attempts => return Err(err),
                Err(err) => {
                    warn!(attempt = number, error = %err, "attempt failed, retrying");
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}
