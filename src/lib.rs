pub mod circuit_breaker;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod wrapper;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerService, CircuitState};
pub use config::ResilienceConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use retry::{RetryExecutor, RetryPolicy};
pub use wrapper::Wrapper;

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circuit_retry=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
