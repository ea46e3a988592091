//! Fixed-interval throttle for the synthesis loop.
//!
//! The pipeline processes items strictly sequentially and pauses between
//! them to protect the completion service and rate-limited content sources
//! from burst load. Modeled as an explicit rate limiter rather than ad hoc
//! sleeps so the pacing contract is testable with tokio's paused clock.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend for one interval. A zero interval returns immediately.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        tokio::time::sleep(self.interval).await;
    }
}
