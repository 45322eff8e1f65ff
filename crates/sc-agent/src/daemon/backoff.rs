//! Respawn backoff for crashed collectors

use std::time::Duration;

use sc_core::config::BackoffConfig;

/// Exponential backoff with jitter between respawn attempts
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    multiplier: f64,
    /// Fraction of the delay added at random (0.0 to 1.0)
    jitter: f64,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier, config.jitter)
    }

    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial,
            current: initial.min(max),
            max,
            multiplier,
            jitter,
            attempts: 0,
        }
    }

    /// Delay before the next respawn. Advances the backoff.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempts = self.attempts.saturating_add(1);

        let next = Duration::from_secs_f64(self.current.as_secs_f64() * self.multiplier);
        self.current = next.min(self.max);

        let jitter = delay.as_secs_f64() * self.jitter * rand::random::<f64>();
        delay + Duration::from_secs_f64(jitter)
    }

    /// Back to the initial delay, after the collector has stayed up
    pub fn reset(&mut self) {
        self.current = self.initial.min(self.max);
        self.attempts = 0;
    }

    /// Respawns since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Uptime after which a crash no longer counts as a crash loop
    pub fn max(&self) -> Duration {
        self.max
    }
}
