//! Exponential backoff with optional jitter.

use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before the given retry attempt (1-based).
///
/// The un-jittered ceiling is `min(base * 2^attempt, max)` and is
/// non-decreasing in `attempt`. With jitter enabled the capped value is
/// multiplied by a uniform factor in `[0, 1)`, so individual delays may be
/// arbitrarily small but never exceed the ceiling.
pub fn delay_for_attempt(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let max_ms = config.max_delay.as_millis() as u64;

    let exponential = 2u64.saturating_pow(attempt);
    let ceiling = base_ms.saturating_mul(exponential).min(max_ms);

    if config.jitter {
        use rand::Rng;
        let factor: f64 = rand::thread_rng().gen();
        Duration::from_millis((ceiling as f64 * factor) as u64)
    } else {
        Duration::from_millis(ceiling)
    }
}
