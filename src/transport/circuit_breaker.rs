//! Per-host circuit breaker for provider failure isolation.
//!
//! Each host carries a weighted failure counter and an "open until"
//! timestamp. Severe failures (HTTP 429) count double. Reaching the
//! threshold opens the circuit for a fixed cooldown and soft-resets the
//! counter, so the failures that tripped it don't count toward the next
//! window. A single success closes the circuit immediately. State is
//! in-memory and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// Default weighted failures before a circuit opens.
const DEFAULT_FAIL_THRESHOLD: u32 = 14;

/// Default time a tripped circuit stays open.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(18);

/// Internal circuit state for a single host.
#[derive(Debug, Default)]
struct Circuit {
    /// Weighted failure count since the last success or trip.
    failures: u32,
    /// The circuit rejects calls until this instant.
    open_until: Option<Instant>,
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Weighted failures before opening the circuit.
    pub fail_threshold: u32,
    /// How long a tripped circuit stays open.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Per-host circuit breaker.
///
/// Thread-safe; circuits are created lazily per host and kept for the life
/// of the process.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Lock the circuits mutex, recovering from poison if necessary.
    ///
    /// Worst case after recovery is slightly stale circuit state, which
    /// beats panicking inside every provider call.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether calls to `host` are currently allowed.
    pub fn allow(&self, host: &str) -> bool {
        let circuits = self.lock_circuits();
        match circuits.get(host).and_then(|c| c.open_until) {
            Some(until) => Instant::now() >= until,
            None => true,
        }
    }

    /// Record a successful call: clears the counter and closes the circuit
    /// immediately.
    pub fn record_success(&self, host: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(host.to_string()).or_default();
        if circuit.failures > 0 || circuit.open_until.is_some() {
            debug!("Circuit breaker: success for '{}', circuit closed", host);
        }
        circuit.failures = 0;
        circuit.open_until = None;
    }

    /// Record a failed call. Severe failures (rate limiting) weigh double.
    /// Reaching the threshold opens the circuit for the cooldown and
    /// soft-resets the counter.
    pub fn record_failure(&self, host: &str, severe: bool) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(host.to_string()).or_default();
        circuit.failures += if severe { 2 } else { 1 };
        if circuit.failures >= self.config.fail_threshold {
            info!(
                "Circuit breaker: opening circuit for '{}' for {:?} after {} weighted failures",
                host, self.config.cooldown, circuit.failures
            );
            circuit.open_until = Some(Instant::now() + self.config.cooldown);
            circuit.failures = 0;
        } else {
            debug!(
                "Circuit breaker: failure for '{}' ({}/{})",
                host, circuit.failures, self.config.fail_threshold
            );
        }
    }

    /// Current weighted failure count for `host`.
    pub fn failure_count(&self, host: &str) -> u32 {
        let circuits = self.lock_circuits();
        circuits.get(host).map(|c| c.failures).unwrap_or(0)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            fail_threshold: threshold,
            cooldown,
        })
    }

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(cb.allow("finnhub.io"));
        assert_eq!(cb.failure_count("finnhub.io"), 0);
    }

    #[test]
    fn test_circuit_opens_at_threshold() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_failure("finnhub.io", false);
        cb.record_failure("finnhub.io", false);
        assert!(cb.allow("finnhub.io"));
        cb.record_failure("finnhub.io", false);
        assert!(!cb.allow("finnhub.io"));
    }

    #[test]
    fn test_severe_failures_weigh_double() {
        let cb = breaker(4, Duration::from_secs(60));
        cb.record_failure("finnhub.io", true);
        assert!(cb.allow("finnhub.io"));
        cb.record_failure("finnhub.io", true);
        assert!(!cb.allow("finnhub.io"));
    }

    #[test]
    fn test_trip_soft_resets_counter() {
        let cb = breaker(2, Duration::from_millis(10));
        cb.record_failure("finnhub.io", false);
        cb.record_failure("finnhub.io", false);
        assert!(!cb.allow("finnhub.io"));
        // The failures that tripped the circuit don't count again
        assert_eq!(cb.failure_count("finnhub.io"), 0);
    }

    #[test]
    fn test_circuit_closes_after_cooldown() {
        let cb = breaker(1, Duration::from_millis(10));
        cb.record_failure("finnhub.io", false);
        assert!(!cb.allow("finnhub.io"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow("finnhub.io"));
    }

    #[test]
    fn test_success_clears_counter_and_closes() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_failure("finnhub.io", false);
        cb.record_failure("finnhub.io", false);
        cb.record_success("finnhub.io");
        assert_eq!(cb.failure_count("finnhub.io"), 0);
        // Counter restarted: two more failures still don't trip it
        cb.record_failure("finnhub.io", false);
        cb.record_failure("finnhub.io", false);
        assert!(cb.allow("finnhub.io"));
    }

    #[test]
    fn test_success_closes_open_circuit_immediately() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_failure("finnhub.io", false);
        assert!(!cb.allow("finnhub.io"));
        cb.record_success("finnhub.io");
        assert!(cb.allow("finnhub.io"));
    }

    #[test]
    fn test_host_isolation() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_failure("finnhub.io", false);
        assert!(!cb.allow("finnhub.io"));
        assert!(cb.allow("api.polygon.io"));
    }
}
