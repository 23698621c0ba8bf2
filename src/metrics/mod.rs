//! Metric recording for breakers and retries.
//!
//! Everything here goes through the `metrics` facade. Nothing is exported
//! unless the host application installs a recorder.

use crate::circuit_breaker::CircuitState;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_gauge!(
        "circuit_breaker_state",
        "Circuit breaker state (0 = closed, 1 = open, 2 = half-open)"
    );
    describe_counter!(
        "circuit_breaker_transitions_total",
        "Total number of circuit breaker state transitions"
    );
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Total number of calls rejected by an open circuit breaker"
    );
    describe_counter!(
        "retry_attempts_total",
        "Total number of retries scheduled after a failed attempt"
    );
    describe_histogram!(
        "retry_attempt_number",
        "Attempt number of each failed attempt that is retried"
    );
    describe_counter!(
        "retry_exhausted_total",
        "Total number of calls that failed after exhausting all attempts"
    );
    describe_histogram!(
        "retry_exhausted_attempts",
        "Attempts made by calls that exhausted their retries"
    );
}

/// Record circuit breaker state
pub fn record_circuit_breaker_state(breaker: &str, state: CircuitState) {
    let labels = [("breaker", breaker.to_string())];
    gauge!("circuit_breaker_state", &labels).set(state.as_gauge() as f64);
}

/// Record circuit breaker transition
pub fn record_circuit_breaker_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    let labels = [
        ("breaker", breaker.to_string()),
        ("from", from.to_string()),
        ("to", to.to_string()),
    ];
    counter!("circuit_breaker_transitions_total", &labels).increment(1);
}

/// Record a rejected call
pub fn record_circuit_breaker_rejection(breaker: &str) {
    let labels = [("breaker", breaker.to_string())];
    counter!("circuit_breaker_rejections_total", &labels).increment(1);
}

/// Record a scheduled retry
pub fn record_retry_attempt(attempt: u32) {
    counter!("retry_attempts_total").increment(1);
    histogram!("retry_attempt_number").record(attempt as f64);
}

/// Record a call that ran out of attempts
pub fn record_retry_exhausted(attempts: u32) {
    counter!("retry_exhausted_total").increment(1);
    histogram!("retry_exhausted_attempts").record(attempts as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    use metrics::{
        with_local_recorder, Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder,
        SharedString, Unit,
    };
    use parking_lot::Mutex;

    /// Remembers every series registered through it
    #[derive(Default)]
    struct SeriesRecorder {
        series: Mutex<Vec<Key>>,
    }

    impl SeriesRecorder {
        fn keys(&self, name: &str) -> Vec<Key> {
            self.series
                .lock()
                .iter()
                .filter(|key| key.name() == name)
                .cloned()
                .collect()
        }
    }

    impl Recorder for SeriesRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.series.lock().push(key.clone());
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.series.lock().push(key.clone());
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.series.lock().push(key.clone());
            Histogram::noop()
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed; all calls are no-ops and must not panic
        describe_metrics();
        record_circuit_breaker_state("payments", CircuitState::Open);
        record_circuit_breaker_transition("payments", CircuitState::Closed, CircuitState::Open);
        record_circuit_breaker_rejection("payments");
        record_retry_attempt(1);
        record_retry_exhausted(3);
    }

    #[test]
    fn test_retry_series_are_not_labelled_by_attempt() {
        let recorder = SeriesRecorder::default();
        with_local_recorder(&recorder, || {
            for attempt in 1..=50 {
                record_retry_attempt(attempt);
            }
            record_retry_exhausted(50);
        });

        for name in [
            "retry_attempts_total",
            "retry_attempt_number",
            "retry_exhausted_total",
            "retry_exhausted_attempts",
        ] {
            let keys = recorder.keys(name);
            assert!(!keys.is_empty(), "{name} not recorded");
            assert!(keys.iter().all(|key| key.labels().next().is_none()));
        }
    }

    #[test]
    fn test_new_breaker_exports_closed_state() {
        let recorder = SeriesRecorder::default();
        with_local_recorder(&recorder, || {
            CircuitBreaker::new("payments", CircuitBreakerConfig::default());
        });

        let keys = recorder.keys("circuit_breaker_state");
        assert_eq!(keys.len(), 1);
        let label = keys[0].labels().next().unwrap();
        assert_eq!(label.key(), "breaker");
        assert_eq!(label.value(), "payments");
    }
}
