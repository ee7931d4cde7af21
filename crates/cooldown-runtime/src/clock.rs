//! Session clock: epoch milliseconds derived from the tokio clock.
//!
//! The origin pairs an epoch timestamp with a tokio `Instant`, so a paused
//! runtime (tests, `cooldown simulate`) yields deterministic timestamps.

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin_ms: u64,
    origin: Instant,
}

impl SessionClock {
    /// Clock whose current time is `origin_ms`.
    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            origin_ms,
            origin: Instant::now(),
        }
    }

    /// Clock anchored to wall time.
    pub fn system() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self::starting_at(u64::try_from(now).unwrap_or(0))
    }

    pub fn now_ms(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_millis();
        self.origin_ms
            .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    /// The tokio instant corresponding to epoch millisecond `at_ms`.
    pub fn instant_at(&self, at_ms: u64) -> Instant {
        self.origin + std::time::Duration::from_millis(at_ms.saturating_sub(self.origin_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn paused_clock_is_deterministic() {
        let clock = SessionClock::starting_at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(clock.now_ms(), 3_500);
    }

    #[tokio::test(start_paused = true)]
    async fn instant_at_maps_epoch_to_tokio_time() {
        let clock = SessionClock::starting_at(10_000);
        tokio::time::sleep_until(clock.instant_at(12_000)).await;
        assert_eq!(clock.now_ms(), 12_000);
    }

    #[test]
    fn system_clock_is_recent() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            // 2020-01-01T00:00:00Z
            assert!(SessionClock::system().now_ms() > 1_577_836_800_000);
        });
    }
}
