//! Exponential backoff for the bulk executor's per-batch retry loop (spec §4.F).

use rand::Rng;
use std::time::Duration;

/// Tunables for [`ExponentialBackoff`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub multiplier: f64,
    /// Delay is never allowed to exceed this.
    pub max_delay: Duration,
    /// Fraction of the computed delay randomized to avoid retry storms, e.g. `0.2` for ±20%.
    pub jitter_fraction: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.2,
        }
    }
}

/// Computes the delay before a given retry attempt (spec §4.F "retried up to maxAttempts
/// with exponential backoff").
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Maximum attempts configured, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Delay before `attempt` (1-based; `attempt == 1` is the first retry, not the initial
    /// try). Returns `None` once `attempt` exceeds `max_attempts`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.config.max_attempts {
            return None;
        }

        let exponent = (attempt - 1) as i32;
        let raw_secs =
            self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let capped_secs = raw_secs.min(self.config.max_delay.as_secs_f64());

        let jittered_secs = if self.config.jitter_fraction > 0.0 {
            let jitter_range = capped_secs * self.config.jitter_fraction;
            let offset = rand::rng().random_range(-jitter_range..=jitter_range);
            (capped_secs + offset).max(0.0)
        } else {
            capped_secs
        };

        Some(Duration::from_secs_f64(jittered_secs))
    }
}
