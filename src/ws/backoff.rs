/// Deterministic reconnect backoff
///
/// Delay for attempt n is `min(30_000, 1_000 * 2^n)` ms. No jitter: the
/// formula is part of the observable contract and tests depend on it.
use std::time::Duration;

/// Base reconnect delay
pub const BASE_DELAY_MS: u64 = 1_000;
/// Delay cap, regardless of attempt count
pub const MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, Default)]
pub struct ReconnectBackoff {
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay for the given attempt number
    pub fn delay_for(attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
    }

    /// Delay for the current attempt; increments the attempt counter after
    /// the schedule is computed.
    pub fn next_delay(&mut self) -> Duration {
        let delay = Self::delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Called on every successful open
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
