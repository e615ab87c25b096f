/// Minimum spacing between calls sharing one connection
///
/// Callers reserve the next free slot under a short lock and sleep outside
/// it, so concurrent detail fetches still go out one interval apart. A 429
/// widens the interval; a run of successes narrows it back.
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Consecutive successes before one step of widening is undone
const SUCCESSES_TO_RECOVER: u32 = 5;

#[derive(Debug)]
struct LimiterState {
    next_slot: Option<Instant>,
    current_interval: Duration,
    consecutive_429s: u32,
    consecutive_successes: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    base_interval: Duration,
    max_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            base_interval: min_interval,
            max_interval: Duration::from_secs(30).max(min_interval),
            state: Mutex::new(LimiterState {
                next_slot: None,
                current_interval: min_interval,
                consecutive_429s: 0,
                consecutive_successes: 0,
            }),
        }
    }

    /// Wait until this caller's slot comes up
    pub async fn acquire(&self) {
        let slot = {
            let mut state = self.state.lock();
            let now = Instant::now();
            let slot = match state.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            state.next_slot = Some(slot + state.current_interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            logger::verbose(
                LogTag::Rpc,
                &format!("Rate limiting: waiting {}ms", (slot - now).as_millis()),
            );
            tokio::time::sleep_until(slot).await;
        }
    }

    pub fn current_interval(&self) -> Duration {
        self.state.lock().current_interval
    }

    /// Double the spacing, capped
    pub fn record_rate_limited(&self) {
        let mut state = self.state.lock();
        state.consecutive_429s += 1;
        state.consecutive_successes = 0;
        state.current_interval = self.interval_for(state.consecutive_429s);
        logger::debug(
            LogTag::Rpc,
            &format!(
                "429 #{}: spacing widened to {}ms",
                state.consecutive_429s,
                state.current_interval.as_millis()
            ),
        );
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.consecutive_429s == 0 {
            return;
        }
        state.consecutive_successes += 1;
        if state.consecutive_successes >= SUCCESSES_TO_RECOVER {
            state.consecutive_successes = 0;
            state.consecutive_429s -= 1;
            state.current_interval = self.interval_for(state.consecutive_429s);
            logger::debug(
                LogTag::Rpc,
                &format!("Spacing narrowed to {}ms", state.current_interval.as_millis()),
            );
        }
    }

    fn interval_for(&self, consecutive_429s: u32) -> Duration {
        let factor = 2u32.saturating_pow(consecutive_429s.min(16));
        self.base_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}
