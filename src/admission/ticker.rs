//! Fixed-cadence rate permits.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Hands out one permit per `1 / per_second` seconds.
///
/// Permits are never banked: after an idle period the next caller proceeds
/// immediately, and the one after it waits a full period. Waiters queue on a
/// fair mutex, so permits are granted in arrival order.
#[derive(Debug)]
pub struct RateTicker {
    period: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateTicker {
    pub fn new(per_second: u32) -> Self {
        let per_second = u64::from(per_second.max(1));
        Self {
            // Rounded up: a permit gap is never shorter than 1 / per_second.
            period: Duration::from_nanos(1_000_000_000u64.div_ceil(per_second)),
            last_grant: Mutex::new(None),
        }
    }

    /// Minimum spacing between two permits.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next permit and return how long the caller waited.
    ///
    /// Cancel safe: a waiter dropped before its permit is granted leaves the
    /// schedule untouched.
    pub async fn wait(&self) -> Duration {
        let start = Instant::now();
        let mut last_grant = self.last_grant.lock().await;
        if let Some(prev) = *last_grant {
            tokio::time::sleep_until(prev + self.period).await;
        }
        let now = Instant::now();
        *last_grant = Some(now);
        now - start
    }
}
