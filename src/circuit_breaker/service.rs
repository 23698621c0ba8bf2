use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of named circuit breakers sharing one configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerService {
    /// Circuit breakers per dependency
    breakers: Arc<DashMap<String, CircuitBreaker>>,
    /// Configuration applied to every breaker created here
    config: CircuitBreakerConfig,
}

impl CircuitBreakerService {
    /// Create a new circuit breaker service
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Get or create the circuit breaker for a dependency
    pub fn breaker(&self, name: &str) -> CircuitBreaker {
        if let Some(existing) = self.breakers.get(name) {
            return existing.clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(breaker = name, "Registering circuit breaker");
                CircuitBreaker::new(name, self.config.clone())
            })
            .clone()
    }

    /// Get the state of a dependency's breaker; unknown names report closed
    pub fn state(&self, name: &str) -> CircuitState {
        match self.breakers.get(name).map(|entry| entry.clone()) {
            Some(breaker) => breaker.state(),
            None => CircuitState::Closed,
        }
    }

    /// Get metrics for a dependency
    pub fn metrics(&self, name: &str) -> Option<CircuitBreakerMetrics> {
        self.breakers.get(name).map(|entry| entry.metrics())
    }

    /// Get all dependency names with circuit breakers
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Get metrics and state for all dependencies
    pub fn all_metrics(&self) -> Vec<(String, CircuitBreakerMetrics, CircuitState)> {
        // Clone out first so no map shard is locked while a state-change
        // handler runs
        let breakers: Vec<(String, CircuitBreaker)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        breakers
            .into_iter()
            .map(|(name, breaker)| {
                let state = breaker.state();
                (name, breaker.metrics(), state)
            })
            .collect()
    }
}
