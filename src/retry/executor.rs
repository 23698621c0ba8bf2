use super::backoff::backoff_delay;
use super::policy::{AttemptInfo, RetryPolicy};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::metrics;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, warn};

/// Retry executor with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    /// Fixed jitter seed; each execution draws from a fresh generator
    seed: Option<u64>,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, seed: None }
    }

    /// Make jitter reproducible by seeding the random source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `f` until it succeeds, the policy gives up, or `ctx` ends.
    ///
    /// - success returns immediately
    /// - an error the policy declines to retry is returned unchanged
    /// - cancellation of `ctx` between attempts returns [`Error::Canceled`]
    ///   or [`Error::DeadlineExceeded`] as is
    /// - running out of attempts returns [`Error::Exhausted`]
    pub async fn execute<F, Fut, T>(&self, ctx: &Context, mut f: F) -> Result<T>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let start = Instant::now();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut attempt = 0;
        let last = loop {
            attempt += 1;
            debug!(attempt, max_attempts, "Executing attempt");

            let err = match self.run_attempt(ctx, &mut f).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                break err;
            }

            if let Some(cancelled) = ctx.err() {
                debug!(attempt, error = %cancelled, "Context ended, abandoning retries");
                return Err(cancelled);
            }

            if !self.policy.should_retry(&err) {
                debug!(attempt, error = %err, "Error not retryable");
                return Err(err);
            }

            let delay = backoff_delay(
                self.policy.base_delay,
                self.policy.max_delay,
                attempt,
                self.policy.jitter,
                &mut rng,
            );

            if let Some(observer) = &self.policy.on_retry {
                observer(&AttemptInfo {
                    attempt,
                    error: &err,
                    delay,
                    elapsed: start.elapsed(),
                });
            }

            debug!(
                attempt,
                wait_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying after backoff"
            );
            metrics::record_retry_attempt(attempt);

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    cancelled = ctx.done() => {
                        debug!(attempt, error = %cancelled, "Context ended during backoff");
                        return Err(cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        };

        let elapsed = start.elapsed();
        warn!(
            attempts = attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %last,
            "Call failed after max attempts"
        );
        metrics::record_retry_exhausted(attempt);

        Err(Error::Exhausted {
            attempts: attempt,
            last: Box::new(last),
            elapsed,
        })
    }

    async fn run_attempt<F, Fut, T>(&self, ctx: &Context, f: &mut F) -> Result<T>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(timeout) = self.policy.timeout_per_try else {
            return f(ctx.clone()).await;
        };

        let attempt_ctx = ctx.with_timeout(timeout);
        let _release = attempt_ctx.cancel_on_drop();

        match attempt_ctx.deadline() {
            Some(deadline) => match tokio::time::timeout_at(deadline, f(attempt_ctx.clone())).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(timeout_ms = timeout.as_millis() as u64, "Attempt timed out");
                    Err(Error::DeadlineExceeded)
                }
            },
            None => f(attempt_ctx.clone()).await,
        }
    }
}
