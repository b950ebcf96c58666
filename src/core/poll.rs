//! Bounded polling with a fixed or backoff delay.
//!
//! The UID lookup after attestation creation is the only step in the run
//! workflow that retries automatically. The policy lives here as data so
//! the budget and delays can be unit-tested without network timing.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Retry budget and delay schedule for a bounded poll.
///
/// The delay is applied *before* each attempt: a poll with `max_attempts`
/// of 4 sleeps, tries, and repeats at most four times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first attempt in milliseconds
    #[serde(default = "default_delay")]
    pub delay_ms: u64,

    /// Multiplier applied to the delay after each attempt; 1.0 keeps
    /// the delay fixed
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on the delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}
fn default_delay() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    1.0
}
fn default_max_delay() -> u64 {
    60_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl PollPolicy {
    /// Calculate the delay preceding a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.delay_ms);
        }

        let delay = self.delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }
}

/// Drive `op` under `policy` until it yields a value, fails, or the
/// attempt budget is exhausted.
///
/// `Ok(Some(_))` stops the poll immediately. `Ok(None)` means the value
/// is not ready yet and the poll continues. `Err(_)` aborts immediately;
/// exhaustion is not an error and returns `Ok(None)`.
pub async fn poll<T, E, F, Fut>(policy: &PollPolicy, mut op: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;

        match op().await {
            Ok(Some(value)) => {
                debug!(attempt, "poll succeeded");
                return Ok(Some(value));
            }
            Ok(None) => {
                debug!(attempt, "not ready yet");
            }
            Err(e) => return Err(e),
        }
    }

    debug!(attempts = policy.max_attempts, "poll budget exhausted");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let policy = PollPolicy {
            max_attempts: 4,
            delay_ms: 10_000,
            backoff_multiplier: 1.0,
            max_delay_ms: 60_000,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(10_000));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let policy = PollPolicy {
            max_attempts: 6,
            delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(5_000)); // Capped
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(5_000));
    }

    #[test]
    fn test_default_uid_budget() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay_ms, 10_000);
        assert_eq!(policy.backoff_multiplier, 1.0);
    }
}
