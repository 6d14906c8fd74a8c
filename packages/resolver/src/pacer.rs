//! Minimum-interval dispatch pacing.
//!
//! Each call to [`Pacer::wait`] reserves the next free slot and sleeps until
//! it arrives, so successive callers are spaced at least `interval` apart
//! no matter how many of them are in flight. The first slot is immediate.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Token-paced dispatcher local to one batch.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer enforcing `interval` between dispatches.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for the next dispatch slot.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let now = Instant::now();
        let slot = {
            let mut next_slot = self
                .next_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.interval);
            slot
        };

        if slot > now {
            tokio::time::sleep_until(slot).await;
        }
    }
}
