//! Retry-with-backoff for model calls.
//!
//! [`retry_with_backoff`] is the single retry loop used for every gateway
//! invocation. It is parameterized by a [`RetryPolicy`]:
//!
//! - `max_attempts`: total attempts including the first one
//! - `backoff`: delay before the next attempt, as a function of how many
//!   attempts have failed so far
//! - `retryable`: which errors are worth another attempt
//!
//! [`RetryGenerate`] applies a policy uniformly to any [`Generate`] backend.
//!
//! # Default Strategy
//!
//! - 3 attempts in total
//! - Linear backoff: 5s after the first failure, 10s after the second
//! - Only rate-limit errors are retried; anything else returns immediately

use super::{Generate, GenerateOptions};
use crate::config::{BackoffKind, GatewayConfig};
use crate::error::GatewayError;
use std::fmt;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `failed_attempts × base`
    Linear(StdDuration),
    /// `base × 2^(failed_attempts-1)`, capped at `max`
    Exponential { base: StdDuration, max: StdDuration },
}

impl Backoff {
    /// Delay to wait after `failed_attempts` consecutive failures (1-based).
    ///
    /// Non-decreasing in `failed_attempts` for both shapes.
    pub fn delay(&self, failed_attempts: usize) -> StdDuration {
        let n = failed_attempts.max(1);
        match *self {
            Backoff::Linear(base) => base.saturating_mul(n as u32),
            Backoff::Exponential { base, max } => {
                let shift = (n - 1).min(31) as u32;
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

/// Parameters for [`retry_with_backoff`].
pub struct RetryPolicy<E> {
    pub max_attempts: usize,
    pub backoff: Backoff,
    pub retryable: fn(&E) -> bool,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retryable: self.retryable,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl RetryPolicy<GatewayError> {
    /// Retry only rate-limited calls.
    pub fn rate_limited(max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: GatewayError::is_rate_limited,
        }
    }

    /// Build the gateway policy from configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let base = StdDuration::from_secs(config.base_delay_secs);
        let backoff = match config.backoff {
            BackoffKind::Linear => Backoff::Linear(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: StdDuration::from_secs(30),
            },
        };
        Self::rate_limited(config.max_attempts, backoff)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy<E>, mut op: F) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        let attempt_t0 = Instant::now();
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let attempt_dt = attempt_t0.elapsed();
                let total_dt = total_t0.elapsed();

                if !(policy.retryable)(&e) {
                    return Err(e);
                }
                if attempt >= policy.max_attempts {
                    error!(
                        attempt,
                        max = policy.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        error = %e,
                        "exhausted retries"
                    );
                    return Err(e);
                }

                let delay = policy.backoff.delay(attempt);
                warn!(
                    attempt,
                    max = policy.max_attempts,
                    elapsed_ms_attempt = attempt_dt.as_millis(),
                    elapsed_ms_total = total_dt.as_millis(),
                    ?delay,
                    error = %e,
                    "attempt failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

/// Decorator that retries any [`Generate`] backend under a policy.
pub struct RetryGenerate<T> {
    inner: T,
    policy: RetryPolicy<GatewayError>,
}

impl<T: Generate> RetryGenerate<T> {
    pub fn new(inner: T, policy: RetryPolicy<GatewayError>) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: Generate> Generate for RetryGenerate<T> {
    #[instrument(level = "info", skip_all, fields(purpose = %options.purpose))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        retry_with_backoff(&self.policy, || self.inner.generate(prompt, options)).await
    }
}
