use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally
    Closed,
    /// Circuit is open, calls are rejected
    Open,
    /// Circuit is half-open, allowing a single probe call
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Callback invoked with `(from, to)` after every state transition
pub type StateChangeHandler = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// Circuit breaker configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Number of consecutive successes in half-open state before closing
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// Time to stay open before allowing a probe, in milliseconds
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,

    /// Invoked synchronously once per transition, outside the breaker lock
    #[serde(skip)]
    pub on_state_change: Option<StateChangeHandler>,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_success_threshold() -> u32 {
    2
}

fn default_open_timeout_ms() -> u64 {
    10_000
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_timeout_ms: default_open_timeout_ms(),
            on_state_change: None,
        }
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("open_timeout_ms", &self.open_timeout_ms)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Register a state-change handler
    pub fn with_state_change_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(handler));
        self
    }

    /// Replace unset (zero) values with their defaults
    pub fn normalized(mut self) -> Self {
        if self.failure_threshold == 0 {
            self.failure_threshold = default_failure_threshold();
        }
        if self.success_threshold == 0 {
            self.success_threshold = default_success_threshold();
        }
        if self.open_timeout_ms == 0 {
            self.open_timeout_ms = default_open_timeout_ms();
        }
        self
    }
}

/// Circuit breaker metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    /// Number of admitted calls
    pub total_requests: u64,
    /// Number of admitted calls that succeeded
    pub successful_requests: u64,
    /// Number of admitted calls that failed
    pub failed_requests: u64,
    /// Number of calls rejected without running
    pub rejected_requests: u64,
    /// Number of times circuit opened
    pub circuit_opened_count: u64,
    /// Number of times circuit closed
    pub circuit_closed_count: u64,
    /// Number of times circuit half-opened
    pub circuit_half_opened_count: u64,
}
