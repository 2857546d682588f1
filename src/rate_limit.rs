use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::info;

use crate::config::{MAX_RATE_LIMIT_SECS, RateLimitConfig};

/// Courtesy delay between downloads.
pub trait Throttle {
    fn pause(&self);
}

impl<T: Throttle + ?Sized> Throttle for &T {
    fn pause(&self) {
        (**self).pause()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RandomDelay {
    min_secs: f64,
    max_secs: f64,
}

impl RandomDelay {
    /// Bounds are expected to be validated by the config loader; they are clamped here regardless.
    pub fn new(config: RateLimitConfig) -> Self {
        let min_secs = config.min_secs.max(0.0).min(MAX_RATE_LIMIT_SECS);
        let max_secs = config.max_secs.min(MAX_RATE_LIMIT_SECS).max(min_secs);
        Self { min_secs, max_secs }
    }

    pub fn sample(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs_f64(secs)
    }
}

impl Throttle for RandomDelay {
    fn pause(&self) {
        let delay = self.sample();
        info!("sleeping {:.1}s before next request", delay.as_secs_f64());
        thread::sleep(delay);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Throttle for NoDelay {
    fn pause(&self) {}
}
