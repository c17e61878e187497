/// Typing signals: outgoing throttle and incoming indicator timer
use std::time::{Duration, Instant};

/// Cool-down between outgoing typing notifications
pub const TYPING_THROTTLE_WINDOW: Duration = Duration::from_millis(2000);

/// How long the incoming "is typing" flag stays up after the latest signal
pub const TYPING_CLEAR_WINDOW: Duration = Duration::from_millis(3000);

/// Pure throttle for outgoing typing notifications.
///
/// The first call in a window fires immediately; calls during the cool-down
/// are dropped entirely, not queued and not coalesced into a trailing call.
/// One process-wide window, independent of the conversation. That means
/// typing signals to different peers share a single cool-down; the original
/// behaves the same way, so it is preserved here rather than fixed.
#[derive(Debug, Clone)]
pub struct TypingThrottle {
    window: Duration,
    last_fired: Option<Instant>,
}

impl TypingThrottle {
    pub fn new() -> Self {
        Self::with_window(TYPING_THROTTLE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Returns true when the caller may send a typing notification now.
    /// A re-entrant call during an in-flight window has no effect on the timer.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(fired) if now.duration_since(fired) < self.window => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

impl Default for TypingThrottle {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient "peer is typing" flag that auto-clears after a fixed window.
/// A fresh signal restarts the window; it does not stack.
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    active_until: Option<Instant>,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&mut self, now: Instant) {
        self.active_until = Some(now + TYPING_CLEAR_WINDOW);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        matches!(self.active_until, Some(until) if now < until)
    }

    /// When the indicator should next be cleared, if it is up
    pub fn deadline(&self) -> Option<Instant> {
        self.active_until
    }

    /// Clear the flag once its window has elapsed; returns true on the
    /// active -> inactive edge.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.active_until {
            Some(until) if now >= until => {
                self.active_until = None;
                true
            }
            _ => false,
        }
    }

    /// Clear the flag unconditionally; returns true when it was up
    pub fn reset(&mut self) -> bool {
        self.active_until.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_fires_once_per_window() {
        let mut throttle = TypingThrottle::new();
        let start = Instant::now();

        assert!(throttle.try_fire(start));
        assert!(!throttle.try_fire(start + Duration::from_millis(1)));
        assert!(!throttle.try_fire(start + Duration::from_millis(1999)));
        assert!(throttle.try_fire(start + Duration::from_millis(2000)));
    }

    #[test]
    fn test_throttle_dropped_calls_do_not_extend_window() {
        let mut throttle = TypingThrottle::new();
        let start = Instant::now();

        assert!(throttle.try_fire(start));
        // Dropped call halfway through must not push the window out
        assert!(!throttle.try_fire(start + Duration::from_millis(1000)));
        assert!(throttle.try_fire(start + Duration::from_millis(2000)));
    }

    #[test]
    fn test_indicator_clears_after_window() {
        let mut indicator = TypingIndicator::new();
        let start = Instant::now();

        indicator.signal(start);
        assert!(indicator.is_active(start + Duration::from_millis(2999)));
        assert!(!indicator.is_active(start + Duration::from_millis(3000)));

        assert!(!indicator.expire(start + Duration::from_millis(2999)));
        assert!(indicator.expire(start + Duration::from_millis(3000)));
        // Already cleared: no second edge
        assert!(!indicator.expire(start + Duration::from_millis(3001)));
    }

    #[test]
    fn test_reset_reports_the_edge() {
        let mut indicator = TypingIndicator::new();
        assert!(!indicator.reset());

        indicator.signal(Instant::now());
        assert!(indicator.reset());
        assert!(indicator.deadline().is_none());
        assert!(!indicator.reset());
    }

    #[test]
    fn test_indicator_restart_does_not_stack() {
        let mut indicator = TypingIndicator::new();
        let start = Instant::now();

        indicator.signal(start);
        indicator.signal(start + Duration::from_millis(2000));
        // Window restarted from the second signal
        assert!(indicator.is_active(start + Duration::from_millis(4999)));
        assert!(!indicator.is_active(start + Duration::from_millis(5000)));
    }
}
