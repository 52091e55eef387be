//! Token-bucket limiter used by the sequential engine to throttle progress.

use std::time::{Duration, Instant};

/// Classic token bucket: holds at most `capacity` tokens and gains
/// `tokens_per_period` every `period`. Starts full.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    tokens_per_period: u32,
    period: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, tokens_per_period: u32, period: Duration) -> Self {
        Self::new_at(capacity, tokens_per_period, period, Instant::now())
    }

    /// Capacity 1, one token per second.
    pub fn per_second() -> Self {
        Self::new(1, 1, Duration::from_secs(1))
    }

    pub fn new_at(capacity: u32, tokens_per_period: u32, period: Duration, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            tokens_per_period,
            period,
            last_refill: now,
        }
    }

    /// Take one token if available, without waiting.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    fn refill(&mut self, now: Instant) {
        if self.period.is_zero() {
            self.tokens = self.capacity;
            self.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let periods = (elapsed.as_nanos() / self.period.as_nanos()) as u64;
        if periods == 0 {
            return;
        }
        let gained = periods.saturating_mul(self.tokens_per_period as u64);
        self.tokens = (self.tokens as u64 + gained).min(self.capacity as u64) as u32;
        // Keep the fractional remainder of the current period.
        self.last_refill += self.period * periods.min(u32::MAX as u64) as u32;
    }
}
