//! Retry composed with circuit breaking.
//!
//! The breaker sits inside the retry loop: every attempt asks for admission
//! on its own and reports its own outcome. Once the breaker opens, later
//! attempts fail with [`Error::BreakerOpen`] without running the action, and
//! the retry predicate decides what happens next.
//!
//! [`Error::BreakerOpen`]: crate::error::Error::BreakerOpen

use crate::circuit_breaker::CircuitBreaker;
use crate::context::Context;
use crate::error::Result;
use crate::retry::{RetryExecutor, RetryPolicy};
use std::future::Future;

#[derive(Debug, Clone, Default)]
pub struct Wrapper {
    /// Retry policy; an unset policy (`max_attempts == 0`) means the default
    pub policy: RetryPolicy,
    /// Breaker gating each attempt
    pub breaker: Option<CircuitBreaker>,
}

impl Wrapper {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            breaker: None,
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// The policy actually used by [`Wrapper::call`]
    pub fn effective_policy(&self) -> RetryPolicy {
        if self.policy.is_unset() {
            RetryPolicy::default()
        } else {
            self.policy.clone()
        }
    }

    /// Run `f` with retries, each attempt gated by the breaker if one is set
    pub async fn call<F, Fut, T>(&self, ctx: &Context, mut f: F) -> Result<T>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let executor = RetryExecutor::new(self.effective_policy());

        let Some(breaker) = &self.breaker else {
            return executor.execute(ctx, f).await;
        };

        executor
            .execute(ctx, |attempt_ctx| {
                // Admission is decided before the action is invoked
                let admitted = breaker
                    .try_acquire()
                    .map(|permit| (permit, f(attempt_ctx)));

                async move {
                    let (permit, call) = admitted?;
                    let result = call.await;
                    permit.record(&result);
                    result
                }
            })
            .await
    }
}
