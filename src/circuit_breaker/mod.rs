pub mod breaker;
pub mod service;
pub mod types;

pub use breaker::{CircuitBreaker, Permit};
pub use service::CircuitBreakerService;
pub use types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState, StateChangeHandler};
