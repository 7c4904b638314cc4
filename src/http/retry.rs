//! Retry policy
//!
//! Exponential backoff with random jitter, capped at a maximum delay.

use crate::config::ClientOptions;
use rand::Rng;
use std::time::Duration;

/// Backoff settings for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling for any single delay
    pub max_delay: Duration,
    /// Upper bound of the random jitter
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&ClientOptions::default())
    }
}

impl RetryPolicy {
    /// Derive the policy from client options
    pub fn from_options(options: &ClientOptions) -> Self {
        Self {
            max_retries: options.max_retry_attempts,
            base_delay: options.retry_base_delay(),
            max_delay: options.max_retry_delay(),
            jitter: options.retry_jitter(),
        }
    }

    /// A policy that retries immediately, without jitter
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Whether retry number `retry` (1-based) is allowed
    pub fn allows(&self, retry: u32) -> bool {
        retry <= self.max_retries
    }

    /// Backoff before retry number `retry` (1-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay before retry number `retry`, honoring a server `Retry-After`
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };

        let computed = self.backoff(retry) + jitter;
        let requested = retry_after.unwrap_or(Duration::ZERO);
        computed.max(requested).min(self.max_delay)
    }
}
