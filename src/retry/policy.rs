use super::classify::{default_retry_on, retry_on_http_status};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failed attempt should be retried
pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Observer invoked before sleeping between attempts
pub type RetryObserver = Arc<dyn Fn(&AttemptInfo<'_>) + Send + Sync>;

/// Details of a failed attempt that is about to be retried
#[derive(Debug)]
pub struct AttemptInfo<'a> {
    /// Attempt that just failed (1-indexed)
    pub attempt: u32,
    /// Error returned by that attempt
    pub error: &'a Error,
    /// Delay before the next attempt
    pub delay: Duration,
    /// Time since the first attempt started
    pub elapsed: Duration,
}

/// Retry policy
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 is treated as 1
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for any computed delay
    pub max_delay: Duration,
    /// Fraction of the delay to randomize, in `[0, 1]`
    pub jitter: f64,
    /// Bound for each individual attempt
    pub timeout_per_try: Option<Duration>,
    /// Retry decision; `None` uses [`default_retry_on`]
    pub retry_on: Option<RetryPredicate>,
    pub on_retry: Option<RetryObserver>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: 0.2,
            timeout_per_try: None,
            retry_on: Some(Arc::new(default_retry_on)),
            on_retry: None,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("timeout_per_try", &self.timeout_per_try)
            .field("retry_on", &self.retry_on.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// A policy with every field unset; see [`crate::Wrapper`] for how it is
    /// resolved
    pub fn unset() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
            timeout_per_try: None,
            retry_on: None,
            on_retry: None,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.max_attempts == 0
    }

    pub fn with_retry_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Some(Arc::new(predicate));
        self
    }

    pub fn with_on_retry<O>(mut self, observer: O) -> Self
    where
        O: Fn(&AttemptInfo<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Whether `err` should be retried under this policy
    pub fn should_retry(&self, err: &Error) -> bool {
        match &self.retry_on {
            Some(predicate) => predicate(err),
            None => default_retry_on(err),
        }
    }
}

/// Retry configuration as loaded from a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fraction of each delay to randomize
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Timeout for each attempt in milliseconds
    #[serde(default)]
    pub timeout_per_try_ms: Option<u64>,

    /// Also retry retryable HTTP status codes
    #[serde(default)]
    pub retry_http_status: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_jitter() -> f64 {
    0.2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
            timeout_per_try_ms: None,
            retry_http_status: false,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        let retry_on: RetryPredicate = if config.retry_http_status {
            Arc::new(retry_on_http_status)
        } else {
            Arc::new(default_retry_on)
        };

        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
            timeout_per_try: config.timeout_per_try_ms.map(Duration::from_millis),
            retry_on: Some(retry_on),
            on_retry: None,
        }
    }
}
