//! Bounded retry with pluggable backoff.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::sleep::Sleeper;

/// Classifies an error as worth another attempt.
///
/// Network-level failures (connection refused, timeouts) are transient.
/// An answer from the remote side, even a negative one, is not.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Delay schedule between consecutive attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed {
        #[serde(rename = "delay_ms", with = "crate::serde_millis")]
        delay: Duration,
    },
    /// `step * n` after the n-th failed attempt (1s, 2s, 3s, ...).
    Linear {
        #[serde(rename = "step_ms", with = "crate::serde_millis")]
        step: Duration,
    },
    /// `base * 2^(n-1)` after the n-th failed attempt, capped at `max`.
    Exponential {
        #[serde(rename = "base_ms", with = "crate::serde_millis")]
        base: Duration,
        #[serde(rename = "max_ms", with = "crate::serde_millis")]
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait after the `failed_attempt`-th attempt (1-indexed).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let n = failed_attempt.max(1);
        match *self {
            Backoff::Fixed { delay } => delay,
            Backoff::Linear { step } => step.saturating_mul(n),
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(n - 1);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::new(max_attempts, Backoff::Linear { step })
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed { delay })
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self::new(max_attempts, Backoff::Exponential { base, max })
    }

    /// A single attempt and no waiting.
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Why [`with_retry`] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    /// The operation failed with an error that must not be retried.
    #[error("attempt {attempt} failed permanently: {error}")]
    Permanent { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent { error, .. } => error,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy runs
/// out of attempts.
///
/// `operation` receives the 1-indexed attempt number. A retry sequence always
/// runs to completion or exhaustion; there is no cancellation hook.
pub async fn with_retry<T, E, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
    S: Sleeper + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_transient() => {
                return Err(RetryError::Permanent { attempt, error });
            }
            Err(error) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                let delay = policy.backoff.delay_after(attempt);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient failure, retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
