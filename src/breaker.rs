//! Consecutive-failure circuit breaker.
//!
//! One breaker is created per attachment and shared by every request going
//! through that attachment. State transitions:
//!
//! ```text
//! closed      → open:    failure count reaches the threshold
//! open        → probing: reset timeout elapses (count is NOT reset)
//! any         → closed:  a success resets count and open timestamp
//! ```
//!
//! Elapsing of the reset timeout only re-admits calls; the failure count
//! stays above the threshold until an actual success clears it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failures: u32,
    opened_at: Option<Instant>,
}

/// Tracks consecutive failures and decides whether calls are allowed.
///
/// All methods take `&self`; the interior mutex keeps notifications from
/// concurrent requests atomic relative to each other.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            threshold: config.failure_threshold,
            reset_timeout: config.reset_timeout,
            state: Mutex::new(BreakerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed right now.
    ///
    /// True while the circuit is closed, and again once the reset timeout
    /// has elapsed since it opened (probing).
    pub fn allow(&self) -> bool {
        let state = self.state();
        if state.failures < self.threshold {
            return true;
        }
        match state.opened_at {
            Some(opened) => opened.elapsed() > self.reset_timeout,
            None => true,
        }
    }

    /// Record a successful response; fully closes the circuit.
    pub fn on_success(&self) {
        let mut state = self.state();
        state.failures = 0;
        state.opened_at = None;
    }

    /// Record a failed attempt.
    pub fn on_failure(&self) {
        let mut state = self.state();
        state.failures += 1;
        // The reset window is measured from the transition into open;
        // failures past the threshold must not push it out.
        if state.failures >= self.threshold && state.opened_at.is_none() {
            state.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(&BreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_millis(reset_ms),
        })
    }

    #[test]
    fn test_opens_exactly_at_threshold() {
        let breaker = breaker(3, 1000);

        breaker.on_failure();
        assert!(breaker.allow());
        breaker.on_failure();
        assert!(breaker.allow());
        breaker.on_failure();
        assert!(!breaker.allow());
    }

    #[test]
    fn test_success_resets_from_any_depth() {
        let breaker = breaker(2, 1000);

        for _ in 0..5 {
            breaker.on_failure();
        }
        assert!(!breaker.allow());

        breaker.on_success();
        assert!(breaker.allow());

        // A fresh run of failures has to cross the threshold again.
        breaker.on_failure();
        assert!(breaker.allow());
        breaker.on_failure();
        assert!(!breaker.allow());
    }

    #[test]
    fn test_probe_allowed_after_reset_timeout() {
        let breaker = breaker(1, 30);

        breaker.on_failure();
        assert!(!breaker.allow());

        sleep(Duration::from_millis(40));
        assert!(breaker.allow());
    }

    #[test]
    fn test_extra_failures_do_not_extend_window() {
        let breaker = breaker(2, 60);

        breaker.on_failure();
        breaker.on_failure();
        assert!(!breaker.allow());

        // A third failure while open must not move the open timestamp.
        sleep(Duration::from_millis(30));
        breaker.on_failure();
        assert!(!breaker.allow());

        // 70ms since opening, 40ms since the last failure.
        sleep(Duration::from_millis(40));
        assert!(breaker.allow());
    }

    #[test]
    fn test_zero_and_one_thresholds_open_on_first_failure() {
        for threshold in [0, 1] {
            let breaker = breaker(threshold, 1000);
            assert!(breaker.allow());
            breaker.on_failure();
            assert!(!breaker.allow());
        }
    }
}
