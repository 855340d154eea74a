//! Dispersal retry loop. Whether a failure is retried is decided by an injected predicate,
//! so the status code table is testable without a disperser.
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::PutTries;
use crate::traits::DisperserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    /// Retry after the rate limit delay, on top of the regular backoff.
    Backoff,
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Carries the last error only.
    #[error("failed after {attempts} attempts: {error}")]
    Failed { attempts: u32, error: E },
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Status code table of a dispersal failure.
pub fn classify_dispersal_error(err: &DisperserError) -> RetryDecision {
    match err {
        DisperserError::Transport(status) => match status.code() {
            tonic::Code::InvalidArgument => RetryDecision::Stop,
            tonic::Code::ResourceExhausted => RetryDecision::Backoff,
            _ => RetryDecision::Retry,
        },
        // failover is only signalled once retries are exhausted
        DisperserError::Failover(_) => RetryDecision::Retry,
        DisperserError::Other(_) => RetryDecision::Retry,
    }
}

/// Upper bound of the exponential part of [exponential_backoff].
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// `base * 2^(attempt - 1)`, capped at [MAX_RETRY_DELAY], plus up to `base` of jitter.
pub fn exponential_backoff(base: Duration) -> impl Fn(u32) -> Duration + Copy {
    move |attempt: u32| {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = base.saturating_mul(1 << exp).min(MAX_RETRY_DELAY);
        let jitter_nanos = base.as_nanos().min(u64::MAX as u128) as u64;
        let jitter = match jitter_nanos {
            0 => Duration::ZERO,
            n => Duration::from_nanos(rand::rng().random_range(0..n)),
        };
        delay + jitter
    }
}

/// Every retry sleeps `backoff(attempt)`. Rate limited failures sleep `rate_limit_delay` on
/// top of it.
pub struct RetryPolicy<P, B> {
    tries: PutTries,
    decide: P,
    backoff: B,
    rate_limit_delay: Duration,
}

impl<P, B> RetryPolicy<P, B> {
    pub fn new(tries: PutTries, decide: P, backoff: B) -> Self {
        Self {
            tries,
            decide,
            backoff,
            rate_limit_delay: Duration::ZERO,
        }
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Runs `op` until it succeeds, the predicate stops it, tries run out or `cancel` fires.
    /// `op` receives the 1-based attempt number. Cancellation is observed while an attempt
    /// is in flight and while sleeping.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        P: Fn(&E) -> RetryDecision,
        B: Fn(u32) -> Duration,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts });
            }
            attempts = attempts.saturating_add(1);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                result = op(attempts) => result,
            };
            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let decision = (self.decide)(&error);
            if decision == RetryDecision::Stop || self.tries.is_exhausted(attempts) {
                return Err(RetryError::Failed { attempts, error });
            }
            warn!(target: "eigenda_dispersal", "attempt {} failed, retrying: {}", attempts, error);

            let mut delay = (self.backoff)(attempts);
            if decision == RetryDecision::Backoff {
                delay += self.rate_limit_delay;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
