use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by guarded actions, the circuit breaker and the retry executor
#[derive(Error, Debug)]
pub enum Error {
    /// The circuit breaker rejected the call without running it
    #[error("Circuit breaker is open")]
    BreakerOpen,

    #[error("Context canceled")]
    Canceled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    /// Every allowed attempt failed; `last` is the final attempt's error
    #[error("Retry failed after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
        elapsed: Duration,
    },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("HTTP status {0}")]
    HttpStatus(StatusCode),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap an arbitrary message as an opaque action error
    pub fn msg<M>(message: M) -> Self
    where
        M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        Error::Other(anyhow::Error::msg(message))
    }

    /// The innermost error, looking through exhausted-retry wrappers
    pub fn cause(&self) -> &Error {
        match self {
            Error::Exhausted { last, .. } => last.cause(),
            other => other,
        }
    }

    /// Check `pred` against this error and, for an exhausted-retry error,
    /// against the wrapped last error.
    pub fn matches_cause<P>(&self, pred: P) -> bool
    where
        P: Fn(&Error) -> bool,
    {
        let mut current = self;
        loop {
            if pred(current) {
                return true;
            }
            match current {
                Error::Exhausted { last, .. } => current = &**last,
                _ => return false,
            }
        }
    }

    pub fn is_breaker_open(&self) -> bool {
        self.matches_cause(|e| matches!(e, Error::BreakerOpen))
    }

    /// Caller cancellation or an expired deadline
    pub fn is_cancellation(&self) -> bool {
        self.matches_cause(|e| matches!(e, Error::Canceled | Error::DeadlineExceeded))
    }

    /// Whether this error is classified as a transient network timeout
    pub fn is_timeout(&self) -> bool {
        self.matches_cause(|e| match e {
            Error::Timeout(_) => true,
            Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
            Error::Http(err) => err.is_timeout(),
            Error::Other(err) => {
                err.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
                    || err
                        .downcast_ref::<reqwest::Error>()
                        .is_some_and(reqwest::Error::is_timeout)
            }
            _ => false,
        })
    }

    /// HTTP status carried by this error or its cause
    pub fn status(&self) -> Option<StatusCode> {
        match self.cause() {
            Error::HttpStatus(status) => Some(*status),
            Error::Http(err) => err.status(),
            _ => None,
        }
    }
}
