//! Configuration for the retry and circuit-breaker middleware.
//!
//! Both structs are plain data with serde derives so host applications can
//! embed them in their own configuration files. They are read once at
//! attachment time and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour for one attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries per logical request.
    pub retries: u32,

    /// Backoff base delay.
    pub base_delay: Duration,

    /// Backoff cap.
    pub max_delay: Duration,

    /// Randomize each delay to avoid synchronized retry storms.
    pub jitter: bool,

    /// HTTP status codes that are worth retrying.
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(5000),
            jitter: true,
            retry_status_codes: vec![500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub(crate) fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Circuit-breaker behaviour for one attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is allowed through.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(10_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
        assert!(config.jitter);
        assert_eq!(config.retry_status_codes, vec![500, 502, 503, 504]);
    }

    #[test]
    fn test_breaker_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn test_retryable_status_lookup() {
        let config = RetryConfig::default();
        assert!(config.is_retryable_status(503));
        assert!(!config.is_retryable_status(404));

        let custom = RetryConfig {
            retry_status_codes: vec![429],
            ..Default::default()
        };
        assert!(custom.is_retryable_status(429));
        assert!(!custom.is_retryable_status(500));
    }
}
