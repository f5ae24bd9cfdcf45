//! Circuit Breaker pattern implementation.
//!
//! Stops a provider run when items keep failing in a row, which usually means
//! the site is down, blocking us or has changed its markup.
//!
//! Only fetch failures count. A stored image or a page that simply has no
//! image resets the streak; skipped items leave it untouched.

use crate::error::{AppError, Result};
use crate::models::CircuitBreakerConfig;

/// Consecutive-failure circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: usize,
    consecutive_failures: usize,
    total_failures: usize,
}

/// Result of circuit breaker check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitBreakerResult {
    /// No failure since the last success
    Closed,
    /// Failing, but below the threshold
    Degraded { consecutive_failures: usize },
    /// Threshold reached, stop the run
    Triggered { consecutive_failures: usize },
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration.
    pub fn new() -> Self {
        Self::with_config(&CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration.
    pub fn with_config(config: &CircuitBreakerConfig) -> Self {
        Self {
            threshold: config.max_consecutive_failures.max(1),
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.total_failures += 1;
    }

    pub fn total_failures(&self) -> usize {
        self.total_failures
    }

    /// Current state of the breaker.
    pub fn check(&self) -> CircuitBreakerResult {
        match self.consecutive_failures {
            0 => CircuitBreakerResult::Closed,
            n if n >= self.threshold => CircuitBreakerResult::Triggered {
                consecutive_failures: n,
            },
            n => CircuitBreakerResult::Degraded {
                consecutive_failures: n,
            },
        }
    }

    /// Validate and return Ok if safe, Err if circuit breaker triggered.
    pub fn validate(&self) -> Result<()> {
        match self.check() {
            CircuitBreakerResult::Closed => Ok(()),
            CircuitBreakerResult::Degraded {
                consecutive_failures,
            } => {
                log::debug!(
                    "Circuit breaker: {} consecutive failures (threshold {})",
                    consecutive_failures,
                    self.threshold
                );
                Ok(())
            }
            CircuitBreakerResult::Triggered {
                consecutive_failures,
            } => {
                log::error!(
                    "Circuit breaker: TRIGGERED after {} consecutive failures",
                    consecutive_failures
                );
                Err(AppError::CircuitBreakerTriggered {
                    consecutive_failures,
                    threshold: self.threshold,
                })
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: usize) -> CircuitBreaker {
        CircuitBreaker::with_config(&CircuitBreakerConfig {
            max_consecutive_failures: threshold,
        })
    }

    #[test]
    fn test_closed_initially() {
        let cb = CircuitBreaker::new();
        assert_eq!(cb.check(), CircuitBreakerResult::Closed);
        assert!(cb.validate().is_ok());
    }

    #[test]
    fn test_degraded_below_threshold() {
        let mut cb = breaker(3);
        cb.record_failure();
        cb.record_failure();

        assert_eq!(
            cb.check(),
            CircuitBreakerResult::Degraded {
                consecutive_failures: 2
            }
        );
        assert!(cb.validate().is_ok());
    }

    #[test]
    fn test_success_resets_streak() {
        let mut cb = breaker(3);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();

        assert!(matches!(cb.check(), CircuitBreakerResult::Degraded { .. }));
        assert_eq!(cb.total_failures(), 3);
    }

    #[test]
    fn test_triggered_at_threshold() {
        let mut cb = breaker(3);
        for _ in 0..3 {
            cb.record_failure();
        }

        assert!(matches!(
            cb.check(),
            CircuitBreakerResult::Triggered { .. }
        ));
    }

    #[test]
    fn test_validate_returns_error() {
        let mut cb = breaker(2);
        cb.record_failure();
        cb.record_failure();

        let result = cb.validate();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            AppError::CircuitBreakerTriggered {
                consecutive_failures: 2,
                threshold: 2
            }
        ));
    }
}
