use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::wrapper::Wrapper;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resilience configuration for one guarded dependency
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Circuit breaker settings; no breaker when absent
    #[serde(default)]
    pub breaker: Option<CircuitBreakerConfig>,
    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ResilienceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Build a wrapper for the dependency called `name`
    pub fn build_wrapper(&self, name: &str) -> Wrapper {
        Wrapper {
            policy: RetryPolicy::from(self.retry.clone()),
            breaker: self
                .breaker
                .clone()
                .map(|config| CircuitBreaker::new(name, config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
breaker:
  failure_threshold: 3
  success_threshold: 1
  open_timeout_ms: 5000

retry:
  max_attempts: 4
  base_delay_ms: 50
  max_delay_ms: 800
  jitter: 0.1
  timeout_per_try_ms: 1500
  retry_http_status: true
"#;

        let config = ResilienceConfig::from_yaml(yaml).unwrap();
        let breaker = config.breaker.as_ref().unwrap();
        assert_eq!(breaker.failure_threshold, 3);
        assert_eq!(breaker.success_threshold, 1);
        assert_eq!(breaker.open_timeout(), Duration::from_secs(5));

        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 50);
        assert_eq!(config.retry.max_delay_ms, 800);
        assert_eq!(config.retry.jitter, 0.1);
        assert_eq!(config.retry.timeout_per_try_ms, Some(1500));
        assert!(config.retry.retry_http_status);
    }

    #[test]
    fn test_default_values() {
        let yaml = r#"
breaker: {}
retry: {}
"#;

        let config = ResilienceConfig::from_yaml(yaml).unwrap();
        let breaker = config.breaker.as_ref().unwrap();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.success_threshold, 2);
        assert_eq!(breaker.open_timeout_ms, 10_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 100);
        assert_eq!(config.retry.max_delay_ms, 2000);
        assert!(!config.retry.retry_http_status);
    }

    #[test]
    fn test_breaker_is_optional() {
        let config = ResilienceConfig::from_yaml("retry:\n  max_attempts: 2\n").unwrap();
        assert!(config.breaker.is_none());

        let wrapper = config.build_wrapper("search");
        assert!(wrapper.breaker.is_none());
        assert_eq!(wrapper.policy.max_attempts, 2);
    }

    #[test]
    fn test_build_wrapper_with_breaker() {
        let config = ResilienceConfig {
            breaker: Some(CircuitBreakerConfig {
                failure_threshold: 0,
                ..Default::default()
            }),
            retry: RetryConfig::default(),
        };

        let wrapper = config.build_wrapper("payments");
        let breaker = wrapper.breaker.as_ref().unwrap();
        assert_eq!(breaker.name(), "payments");
        // Zero threshold is normalized rather than rejected
        assert_eq!(breaker.config().failure_threshold, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retry:\n  max_attempts: 6\n  jitter: 0.0").unwrap();

        let config = ResilienceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.jitter, 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let err = ResilienceConfig::from_yaml("retry: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ResilienceConfig::from_file("/nonexistent/resilience.yaml").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Failed to read config file"));
    }
}
