//! Request pacing.
//!
//! Every network-issuing component pauses through a [`Throttle`] after each
//! fetch. The throttle is owned by the fetcher and passed in at construction,
//! so tests can swap in [`NoDelay`].

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::config::ThrottleConfig;

/// Rate-shaping primitive shared by listing and detail fetches.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Block the caller for one pacing interval.
    async fn pause(&self);
}

/// Sleeps for a duration drawn uniformly from `[min, max]`.
#[derive(Debug, Clone)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(
            Duration::from_secs_f64(config.min_secs.max(0.0)),
            Duration::from_secs_f64(config.max_secs.max(0.0)),
        )
    }

    /// Draw the next delay.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

impl Default for RandomDelay {
    fn default() -> Self {
        Self::from_config(&ThrottleConfig::default())
    }
}

#[async_trait]
impl Throttle for RandomDelay {
    async fn pause(&self) {
        let delay = self.next_delay();
        debug!("Sleeping {:.2}s", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}
