use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;

use crate::config::PacingConfig;

/// Randomized delays that keep send traffic looking unhurried.
#[derive(Debug, Clone)]
pub struct Pacing {
    webhook: RangeInclusive<u64>,
    batch: RangeInclusive<u64>,
}

impl Pacing {
    /// Ranges are assumed valid; `PacingConfig::validate` runs at load time.
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            webhook: config.min_webhook_delay_ms..=config.max_webhook_delay_ms,
            batch: config.min_batch_delay_ms..=config.max_batch_delay_ms,
        }
    }

    /// Milliseconds to wait before each webhook send.
    pub fn next_webhook_delay(&self) -> u64 {
        sample(&self.webhook)
    }

    /// Milliseconds to wait after one message before starting the next.
    pub fn next_batch_delay(&self) -> u64 {
        sample(&self.batch)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(&PacingConfig::default())
    }
}

fn sample(range: &RangeInclusive<u64>) -> u64 {
    if range.start() >= range.end() {
        return *range.start();
    }
    rand::rng().random_range(range.clone())
}

pub async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
