use circuit_retry::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use circuit_retry::retry::RetryPolicy;
use circuit_retry::{Context, Error, Wrapper};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_wrapper_composes_breaker_and_retry() {
    let breaker = CircuitBreaker::new(
        "dependency",
        CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout_ms: 50,
            ..Default::default()
        },
    );
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        jitter: 0.0,
        ..Default::default()
    }
    .with_retry_on(|_| true);
    let wrapper = Wrapper::new(policy).with_breaker(breaker.clone());
    let ctx = Context::new();

    let first = wrapper
        .call(&ctx, |_| async { Err::<(), _>(Error::msg("fail")) })
        .await;
    assert!(first.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);

    // Breaker is open now, so the wrapper fails fast
    let ran = Arc::new(AtomicU32::new(0));
    let counter = ran.clone();
    let second = wrapper
        .call(&ctx, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

    assert!(second.unwrap_err().is_breaker_open());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unset_policy_uses_defaults() {
    let wrapper = Wrapper {
        policy: RetryPolicy::unset(),
        breaker: None,
    };

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result = wrapper
        .call(&Context::new(), move |_| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Timeout("slow upstream".to_string()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

    // Three default attempts, timeouts retried by the default predicate
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_wrapper_returns_cancellation_verbatim() {
    let breaker = CircuitBreaker::new("dependency", CircuitBreakerConfig::default());
    let wrapper = Wrapper::new(RetryPolicy::default().with_retry_on(|_| true)).with_breaker(breaker);

    let ctx = Context::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = wrapper
        .call(&ctx, |_| async { Err::<(), _>(Error::msg("still failing")) })
        .await;

    assert!(matches!(result, Err(Error::Canceled)));
}

#[tokio::test]
async fn test_breaker_recovers_through_wrapper() {
    let breaker = CircuitBreaker::new(
        "dependency",
        CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 2,
            open_timeout_ms: 10,
            ..Default::default()
        },
    );
    let wrapper = Wrapper::new(RetryPolicy {
        max_attempts: 1,
        ..Default::default()
    })
    .with_breaker(breaker.clone());
    let ctx = Context::new();

    let _ = wrapper.call(&ctx, |_| async { Err::<(), _>(Error::msg("down")) }).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(15)).await;
    wrapper.call(&ctx, |_| async { Ok(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    wrapper.call(&ctx, |_| async { Ok(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}
