//! Retry predicates.

use crate::error::Error;
use http::StatusCode;

/// Conservative default: retries transient network timeouts only.
///
/// Cancellation and deadline conditions are never retried.
pub fn default_retry_on(err: &Error) -> bool {
    if err.is_cancellation() {
        return false;
    }
    err.is_timeout()
}

/// Timeout-only predicate for composing with custom logic
pub fn retry_temporary(err: &Error) -> bool {
    err.is_timeout()
}

/// Status codes worth retrying
pub fn retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// [`default_retry_on`] plus any error carrying a retryable HTTP status
pub fn retry_on_http_status(err: &Error) -> bool {
    if err.is_cancellation() {
        return false;
    }
    err.status().is_some_and(retryable_status) || default_retry_on(err)
}
