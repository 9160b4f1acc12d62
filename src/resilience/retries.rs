//! Retry logic.
//!
//! # Responsibilities
//! - Run an operation up to a fixed number of attempts
//! - Pause a fixed interval between attempts (no exponential growth)
//! - Stop immediately when the caller's context is cancelled
//!
//! # Design Decisions
//! - Cancellation is checked before every attempt, never mid-attempt
//! - No pause after the final attempt
//! - Attempt numbers passed to the operation start at 1

use std::future::Future;
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::lifecycle::Context;

/// Outcome of a retry loop that did not succeed.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The context was cancelled before an attempt.
    Cancelled { attempts: u32 },
    /// Every attempt failed; carries the last failure.
    Exhausted { attempts: u32, last: E },
}

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.retries, config.retry_interval())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until it succeeds, attempts run out, or `ctx` is cancelled.
    pub async fn run<T, E, F, Fut>(&self, ctx: &Context, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(last) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted { attempts: attempt, last });
                }
                Err(_) => tokio::time::sleep(self.interval).await,
            }
        }
    }
}
