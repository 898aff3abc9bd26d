//! Minimum spacing between outbound calls.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Keeps calls at least `gap` apart, across all callers.
///
/// A call may start no sooner than `gap` after the previous start and `gap`
/// after the most recent finish. The first call starts immediately.
#[derive(Debug)]
pub struct CallSpacing {
    gap: Duration,
    next_start: Mutex<Option<Instant>>,
}

impl CallSpacing {
    pub fn new(gap: Duration) -> Self {
        Self {
            gap,
            next_start: Mutex::new(None),
        }
    }

    /// Wait for the next free start slot and claim it.
    pub async fn acquire(&self) {
        if self.gap.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_start.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.gap);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    /// Record that a call has finished; the next start waits a full `gap`.
    pub async fn finish(&self) {
        if self.gap.is_zero() {
            return;
        }
        let earliest = Instant::now() + self.gap;
        let mut next = self.next_start.lock().await;
        *next = Some(next.map_or(earliest, |t| t.max(earliest)));
    }
}
