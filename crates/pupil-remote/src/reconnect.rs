// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Retrying connection attempts with exponential backoff
//!
//! The communicator itself never retries. Callers that want to survive a
//! Pupil Capture restart wrap [`crate::Communicator::connect`] in
//! [`retry_with_backoff`].

use crate::error::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound for a single backoff
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff schedule
#[derive(Debug, Clone)]
pub struct ReconnectionStrategy {
    base_backoff_ms: u64,
    max_backoff_ms: u64,
    current_attempt: u32,
    /// 0 = unlimited
    max_attempts: u32,
}

impl ReconnectionStrategy {
    /// # Arguments
    /// * `base_backoff_ms` - First backoff in milliseconds
    /// * `max_attempts` - Retries before giving up (0 = unlimited)
    pub fn new(base_backoff_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_backoff_ms,
            max_backoff_ms: MAX_BACKOFF_MS,
            current_attempt: 0,
            max_attempts,
        }
    }

    /// Next backoff, doubling each attempt, or `None` once exhausted
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.current_attempt += 1;

        let factor = 2u64.saturating_pow(self.current_attempt - 1);
        let backoff_ms = self
            .base_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Some(Duration::from_millis(backoff_ms))
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn attempt_number(&self) -> u32 {
        self.current_attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_attempts > 0 && self.current_attempt >= self.max_attempts
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the strategy is exhausted
///
/// # Example
/// ```no_run
/// use pupil_remote::{retry_with_backoff, Communicator, CommunicatorConfig, ReconnectionStrategy};
///
/// let config = CommunicatorConfig::new().with_connect_timeout_ms(1000);
/// let mut strategy = ReconnectionStrategy::new(500, 5);
/// let communicator = retry_with_backoff(
///     || Communicator::connect(&config),
///     &mut strategy,
///     "Pupil Remote connection",
/// )?;
/// # Ok::<(), pupil_remote::RemoteError>(())
/// ```
pub fn retry_with_backoff<F, T>(
    mut operation: F,
    strategy: &mut ReconnectionStrategy,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    loop {
        match operation() {
            Ok(result) => {
                if strategy.attempt_number() > 0 {
                    info!(
                        "[RECONNECT] ✓ {} succeeded after {} retries",
                        operation_name,
                        strategy.attempt_number()
                    );
                }
                strategy.reset();
                return Ok(result);
            }
            Err(e) if e.is_retryable() => match strategy.next_backoff() {
                Some(backoff) => {
                    warn!(
                        "[RECONNECT] ⚠ {} failed (attempt {}): {} - retrying in {:?}",
                        operation_name,
                        strategy.attempt_number(),
                        e,
                        backoff
                    );
                    std::thread::sleep(backoff);
                }
                None => {
                    warn!(
                        "[RECONNECT] ✗ {} failed after {} retries - giving up",
                        operation_name,
                        strategy.attempt_number()
                    );
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }
    }
}
