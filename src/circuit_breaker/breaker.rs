use super::types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::metrics;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker guarding a single dependency.
///
/// Cloning is cheap; every clone shares the same state machine.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Dependency identifier used in logs and metric labels
    name: String,
    /// Normalized configuration
    config: CircuitBreakerConfig,
    /// Mutable state, only touched while the lock is held
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    /// Current circuit state
    circuit_state: CircuitState,
    /// Number of consecutive failures in closed state
    consecutive_failures: u32,
    /// Number of consecutive successes in half-open state
    consecutive_successes: u32,
    /// Whether the single half-open probe is running
    half_open_in_flight: bool,
    /// Time when the circuit was opened
    opened_at: Option<Instant>,
    /// Metrics
    metrics: CircuitBreakerMetrics,
}

/// A transition taken under the lock, reported after it is released
#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
}

impl State {
    fn new() -> Self {
        Self {
            circuit_state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            half_open_in_flight: false,
            opened_at: None,
            metrics: CircuitBreakerMetrics::default(),
        }
    }

    /// Lazily move from open to half-open once the open timeout has elapsed
    fn refresh(&mut self, config: &CircuitBreakerConfig, now: Instant) -> Option<Transition> {
        if self.circuit_state != CircuitState::Open {
            return None;
        }
        match self.opened_at {
            Some(opened_at) if now.saturating_duration_since(opened_at) >= config.open_timeout() => {
                self.enter(CircuitState::HalfOpen, now)
            }
            Some(_) => None,
            None => {
                self.opened_at = Some(now);
                None
            }
        }
    }

    fn admit(&mut self) -> bool {
        let admitted = match self.circuit_state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen if self.half_open_in_flight => false,
            CircuitState::HalfOpen => {
                self.half_open_in_flight = true;
                true
            }
        };

        if admitted {
            self.metrics.total_requests += 1;
        } else {
            self.metrics.rejected_requests += 1;
        }
        admitted
    }

    fn on_success(&mut self, config: &CircuitBreakerConfig, now: Instant) -> Option<Transition> {
        self.metrics.successful_requests += 1;

        match self.circuit_state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
                None
            }
            CircuitState::HalfOpen => {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= config.success_threshold {
                    self.enter(CircuitState::Closed, now)
                } else {
                    None
                }
            }
            // Admitted before another caller opened the circuit
            CircuitState::Open => None,
        }
    }

    fn on_failure(&mut self, config: &CircuitBreakerConfig, now: Instant) -> Option<Transition> {
        self.metrics.failed_requests += 1;

        match self.circuit_state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.enter(CircuitState::Open, now)
                } else {
                    None
                }
            }
            // Any failure in half-open state reopens the circuit
            CircuitState::HalfOpen => self.enter(CircuitState::Open, now),
            CircuitState::Open => None,
        }
    }

    fn enter(&mut self, to: CircuitState, now: Instant) -> Option<Transition> {
        let from = self.circuit_state;
        if from == to {
            return None;
        }

        self.circuit_state = to;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;

        match to {
            CircuitState::Open => {
                self.opened_at = Some(now);
                self.metrics.circuit_opened_count += 1;
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight = false;
                self.metrics.circuit_half_opened_count += 1;
            }
            CircuitState::Closed => {
                self.opened_at = None;
                self.metrics.circuit_closed_count += 1;
            }
        }

        Some(Transition { from, to })
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let config = config.normalized();

        info!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            open_timeout_ms = config.open_timeout_ms,
            "Creating circuit breaker"
        );
        metrics::record_circuit_breaker_state(&name, CircuitState::Closed);

        Self {
            inner: Arc::new(Inner {
                name,
                config,
                state: Mutex::new(State::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.inner.config
    }

    /// Get current state, moving an expired open circuit to half-open first
    pub fn state(&self) -> CircuitState {
        let (state, transition) = {
            let mut state = self.inner.state.lock();
            let transition = state.refresh(&self.inner.config, Instant::now());
            (state.circuit_state, transition)
        };

        self.notify(transition);
        state
    }

    /// Get metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.inner.state.lock().metrics.clone()
    }

    /// Ask for admission of one call.
    ///
    /// The returned [`Permit`] must be resolved with the call's outcome. A
    /// permit dropped unresolved counts as a failure.
    pub fn try_acquire(&self) -> Result<Permit> {
        let (admitted, current, transition) = {
            let mut state = self.inner.state.lock();
            let transition = state.refresh(&self.inner.config, Instant::now());
            let admitted = state.admit();
            (admitted, state.circuit_state, transition)
        };

        self.notify(transition);

        if !admitted {
            debug!(
                breaker = %self.inner.name,
                state = %current,
                "Circuit breaker open, rejecting call"
            );
            metrics::record_circuit_breaker_rejection(&self.inner.name);
            return Err(Error::BreakerOpen);
        }

        if current == CircuitState::HalfOpen {
            debug!(breaker = %self.inner.name, "Allowing half-open probe call");
        }

        Ok(Permit {
            breaker: self.clone(),
            resolved: false,
        })
    }

    /// Run `f` under admission control.
    ///
    /// Returns [`Error::BreakerOpen`] without invoking `f` when the call is
    /// rejected; otherwise returns whatever `f` produced.
    pub async fn call<F, Fut, T>(&self, ctx: &Context, f: F) -> Result<T>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.try_acquire()?;
        let result = f(ctx.clone()).await;
        permit.record(&result);
        result
    }

    fn record_outcome(&self, success: bool) {
        let (was_half_open, transition) = {
            let mut state = self.inner.state.lock();
            let was_half_open = state.circuit_state == CircuitState::HalfOpen;
            if was_half_open {
                state.half_open_in_flight = false;
            }

            let now = Instant::now();
            let transition = if success {
                state.on_success(&self.inner.config, now)
            } else {
                state.on_failure(&self.inner.config, now)
            };
            (was_half_open, transition)
        };

        if was_half_open && !success {
            warn!(
                breaker = %self.inner.name,
                "Half-open probe call failed, reopening circuit"
            );
        }

        self.notify(transition);
    }

    /// Report a transition; never called while the state lock is held
    fn notify(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };

        match to {
            CircuitState::Open => info!(breaker = %self.inner.name, %from, "Circuit breaker opening"),
            CircuitState::HalfOpen => info!(
                breaker = %self.inner.name,
                open_timeout = ?self.inner.config.open_timeout(),
                "Circuit breaker transitioning to half-open"
            ),
            CircuitState::Closed => info!(breaker = %self.inner.name, "Circuit breaker closing"),
        }

        metrics::record_circuit_breaker_transition(&self.inner.name, from, to);
        metrics::record_circuit_breaker_state(&self.inner.name, to);

        if let Some(handler) = &self.inner.config.on_state_change {
            handler(from, to);
        }
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`]
#[must_use = "a permit dropped without an outcome is recorded as a failure"]
#[derive(Debug)]
pub struct Permit {
    breaker: CircuitBreaker,
    resolved: bool,
}

impl Permit {
    pub fn record_success(mut self) {
        self.resolved = true;
        self.breaker.record_outcome(true);
    }

    pub fn record_failure(mut self) {
        self.resolved = true;
        self.breaker.record_outcome(false);
    }

    /// Record the outcome of a finished call
    pub fn record<T>(self, result: &Result<T>) {
        if result.is_ok() {
            self.record_success();
        } else {
            self.record_failure();
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.record_outcome(false);
        }
    }
}
