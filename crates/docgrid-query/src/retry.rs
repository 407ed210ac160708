//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use docgrid_core::QuerySettings;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    /// Fraction of the delay randomly added or removed.
    pub jitter: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&QuerySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &QuerySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            multiplier: settings.backoff_multiplier.max(1.0),
            jitter: settings.backoff_jitter.clamp(0.0, 1.0),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }

    /// No waiting between attempts. Handy in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `attempt` (0 for the first retry). Always
    /// within `[0, max_backoff]`, however large `attempt` gets.
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let factor = if self.jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };

        // The exponential overflows to infinity long before `attempt` runs out.
        let secs = base * factor;
        if secs.is_nan() {
            return self.max_backoff;
        }
        Duration::try_from_secs_f64(secs.clamp(0.0, self.max_backoff.as_secs_f64()))
            .unwrap_or(self.max_backoff)
    }
}
