//! Retry policy for failed actions.

use std::time::Duration;

use rollgate_core::{ConfigResult, ExhaustPolicy, RolloutSection};

/// How failed actions are retried.
///
/// After each failed attempt the loop pauses for `poll_interval` and
/// counts the attempt. Once the count exceeds `max_retries` the state is
/// exhausted and `on_exhausted` decides the forced transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub on_exhausted: ExhaustPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_retries: 10,
            on_exhausted: ExhaustPolicy::ForceAdvance,
        }
    }
}

impl RetryPolicy {
    pub fn from_section(section: &RolloutSection) -> ConfigResult<Self> {
        Ok(Self {
            poll_interval: section.poll_interval()?,
            max_retries: section.max_retries,
            on_exhausted: section.on_exhausted,
        })
    }

    /// Whether `failed_attempts` in a single state exhausts the budget.
    pub fn exhausted(&self, failed_attempts: u32) -> bool {
        failed_attempts > self.max_retries
    }
}
