//! Backoff policy
//!
//! Maps a failed attempt to "wait this long, then retry" or "give up".
//! Rules, first match wins:
//!
//! 1. attempt budget spent: give up
//! 2. provider suggested a positive delay: use it as-is
//! 3. rate limited: fixed delay
//! 4. unavailable: `base_delay * attempt`
//! 5. anything else (fatal, success): give up

use docsieve_core::{AttemptOutcome, TransientKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Wait, then attempt again
    Retry(Duration),
    /// Stop retrying
    GiveUp,
}

/// Retry policy for transient classifier failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Attempts allowed per item, including the first
    pub max_attempts: u32,

    /// Wait after a rate limit with no provider hint
    pub rate_limit_delay: Duration,

    /// Linear step for server/connectivity faults
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_delay: Duration::from_secs(60),
            base_delay: Duration::from_secs(15),
        }
    }
}

impl BackoffPolicy {
    /// Decide what follows `attempt` (1-based) ending in `outcome`
    pub fn next_delay(&self, attempt: u32, outcome: &AttemptOutcome) -> BackoffDecision {
        if attempt >= self.max_attempts {
            return BackoffDecision::GiveUp;
        }

        let AttemptOutcome::TransientFailure(failure) = outcome else {
            return BackoffDecision::GiveUp;
        };

        if let Some(delay) = failure.suggested_delay.filter(|d| !d.is_zero()) {
            return BackoffDecision::Retry(delay);
        }

        match failure.kind {
            TransientKind::RateLimited => BackoffDecision::Retry(self.rate_limit_delay),
            TransientKind::Unavailable => {
                BackoffDecision::Retry(self.base_delay.saturating_mul(attempt))
            }
        }
    }
}

/// Serializable retry settings, in whole seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub rate_limit_delay_secs: u64,
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_delay_secs: 60,
            base_delay_secs: 15,
        }
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            rate_limit_delay: Duration::from_secs(config.rate_limit_delay_secs),
            base_delay: Duration::from_secs(config.base_delay_secs),
        }
    }
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
