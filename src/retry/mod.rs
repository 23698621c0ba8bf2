pub mod backoff;
pub mod classify;
pub mod executor;
pub mod policy;
pub mod transport;

pub use backoff::backoff_delay;
pub use classify::{default_retry_on, retry_on_http_status, retry_temporary, retryable_status};
pub use executor::RetryExecutor;
pub use policy::{AttemptInfo, RetryConfig, RetryObserver, RetryPolicy, RetryPredicate};
pub use transport::error_for_retryable_status;
