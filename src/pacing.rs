//! Request pacing for external routing services.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::traits::Pacer;

/// Issues requests immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pace(&self) {}
}

/// Guarantees a minimum spacing between consecutive requests.
///
/// Hosted routing services usually want 100-250 ms between calls.
#[derive(Debug)]
pub struct FixedIntervalPacer {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Pacer for FixedIntervalPacer {
    fn pace(&self) {
        // A poisoned lock still holds a usable timestamp.
        let mut last_call = self.last_call.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "pacing routing request");
                std::thread::sleep(wait);
            }
        }

        *last_call = Some(Instant::now());
    }
}
