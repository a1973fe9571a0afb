//! Retry policy configuration.
//!
//! This is plain data attached to a [`crate::RequestConfiguration`]; the
//! execution engine interprets it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status codes curl's `--retry` treats as transient.
pub const TRANSIENT_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed {
        /// Delay between attempts.
        delay: Duration,
    },
    /// Delay doubles after every failed attempt, up to `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound for any single delay.
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(1),
        }
    }
}

/// How many times to try a request and which outcomes warrant another try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    retry_on: Vec<u16>,
    retry_transport_errors: bool,
}

impl Default for RetryPolicy {
    /// A single attempt: no retries.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::default(),
            retry_on: TRANSIENT_STATUS_CODES.to_vec(),
            retry_transport_errors: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Up to `max_attempts` attempts with the same `delay` between them.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// Up to `max_attempts` attempts, doubling the delay from `initial` up to `max`.
    #[must_use]
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { initial, max },
            ..Self::default()
        }
    }

    /// Replace the retryable status codes.
    #[must_use]
    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = codes.into_iter().collect();
        self
    }

    /// Set whether connection failures are retried.
    #[must_use]
    pub const fn with_transport_errors(mut self, retry: bool) -> Self {
        self.retry_transport_errors = retry;
        self
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay schedule.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Status codes that trigger a retry.
    #[must_use]
    pub fn retry_on(&self) -> &[u16] {
        &self.retry_on
    }

    /// Returns `true` if connection failures are retried.
    #[must_use]
    pub const fn retries_transport_errors(&self) -> bool {
        self.retry_transport_errors
    }

    /// Returns `true` if more than one attempt is allowed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }

    /// Returns `true` if `status` is in the retryable set.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { initial, max } => {
                let exponent = failed_attempt.saturating_sub(1).min(31);
                initial
                    .checked_mul(1_u32 << exponent)
                    .map_or(max, |delay| delay.min(max))
            }
        }
    }
}
