//! Exponential backoff between retries and jitter before attempts.

use std::time::Duration;

use rand::Rng;

use super::ExecutorError;

/// Deterministic exponential backoff: `min(initial * 2^(attempt-1), max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
    max: Duration,
}

impl BackoffPolicy {
    /// Create a policy. `initial <= max` is checked by config validation.
    #[must_use]
    pub const fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay to wait after the failed `attempt` (1-based) before the next one.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` when `attempt` is 0.
    pub fn delay(&self, attempt: u32) -> Result<Duration, ExecutorError> {
        if attempt == 0 {
            return Err(ExecutorError::InvalidArgument(
                "backoff attempt must be >= 1".into(),
            ));
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self.initial.checked_mul(factor).unwrap_or(Duration::MAX);
        Ok(delay.min(self.max))
    }
}

/// Uniform random delay applied before every execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    /// Jitter in `[min, max]`. A zero `max` disables jitter.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No jitter at all.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Sample a jitter duration.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        if self.min >= self.max {
            return self.max;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}
