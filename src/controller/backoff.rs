//! # Backoff
//!
//! Two backoff calculators:
//!
//! - [`FibonacciBackoff`] spaces out requeues of a resource whose reconcile keeps failing.
//!   It grows more slowly than exponential backoff, so a resource that fails for a
//!   while is still retried at a useful cadence.
//! - [`RetryPolicy`] bounds the in-call retries of a provider request after a
//!   transport failure (connect error, timeout). It never applies to HTTP rejections.
//!
//! ## Usage
//!
//! ```rust
//! use mailerlite_operator::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(5, 300);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 10);
//! assert_eq!(backoff.next_backoff_seconds(), 15);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each value is the sum of the previous two, starting from `min_secs` and capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in seconds
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs.min(max_secs),
            max_secs,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        let next = self.prev_secs.saturating_add(self.current_secs);

        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);

        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs.min(self.max_secs);
    }
}

/// Bounded exponential retry policy for transient transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the call is tried at most `max_retries + 1` times
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// A policy that tries exactly once
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait before retry number `retry` (0-based), doubling each time up to `max_delay`
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_HTTP_MAX_RETRIES, DEFAULT_HTTP_RETRY_INITIAL_MS, DEFAULT_HTTP_RETRY_MAX_MS,
        };
        Self::new(
            DEFAULT_HTTP_MAX_RETRIES,
            Duration::from_millis(DEFAULT_HTTP_RETRY_INITIAL_MS),
            Duration::from_millis(DEFAULT_HTTP_RETRY_MAX_MS),
        )
    }
}
