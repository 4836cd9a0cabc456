//! Idle backoff between empty queue scans.

use std::time::Duration;

/// Doubling delay applied by a worker after consecutive empty scans.
///
/// Starts at `min`, doubles per empty scan, saturates at `max`, and snaps
/// back to `min` the moment a scan finds work. The cap bounds wakeup latency
/// after long idle periods; the floor keeps an idle worker from spinning.
#[derive(Debug)]
pub(crate) struct IdleBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl IdleBackoff {
    pub(crate) fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Delay to apply for this empty scan; advances the schedule.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Snap back to the minimum delay.
    pub(crate) fn reset(&mut self) {
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap() {
        let mut backoff = IdleBackoff::new(Duration::from_millis(1), Duration::from_millis(8));

        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2));
        assert_eq!(backoff.next_delay(), Duration::from_millis(4));
        assert_eq!(backoff.next_delay(), Duration::from_millis(8));
        // Saturated: never exceeds the cap.
        for _ in 0..100 {
            assert_eq!(backoff.next_delay(), Duration::from_millis(8));
        }
    }

    #[test]
    fn reset_returns_to_minimum() {
        let mut backoff = IdleBackoff::new(Duration::from_millis(1), Duration::from_millis(64));
        for _ in 0..10 {
            backoff.next_delay();
        }

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
    }

    #[test]
    fn degenerate_equal_bounds_hold_steady() {
        let mut backoff = IdleBackoff::new(Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }
}
