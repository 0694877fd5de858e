use crate::config::{BackoffKind, RetryConfig};
use std::time::Duration;

/// What to do with a task after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-submit the task once `delay` has passed
    Retry { delay: Duration },

    /// Attempts are used up
    GiveUp,
}

/// Bounded retry schedule for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffKind,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        backoff: BackoffKind,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.backoff,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides the fate of a task whose attempt number `attempt` just failed
    ///
    /// `attempt` is 1-based; a policy with `max_attempts = 3` retries after
    /// attempts 1 and 2 and gives up after attempt 3.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                delay: self.backoff_delay(attempt),
            }
        }
    }

    /// Delay before retry number `retry` (1-based)
    ///
    /// Fixed backoff always waits the base delay. Exponential backoff doubles
    /// it per retry, capped at the maximum delay.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
                self.base_delay
                    .checked_mul(factor)
                    .unwrap_or(self.max_delay)
                    .min(self.max_delay)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
