//! Fixed-rate pacing for the refresh loop and playback.

use std::thread;
use std::time::{Duration, Instant};

/// Paces a loop to a fixed rate by sleeping out the rest of each period.
///
/// Deadlines accumulate from the previous one rather than from "now",
/// so short iterations don't speed the loop up. After a stall longer
/// than one period (a capture, a playback run) the clock resumes from
/// the present instead of bursting to catch up.
#[derive(Debug)]
pub struct Clock {
    period: Duration,
    next: Instant,
}

impl Clock {
    /// A clock ticking `rate_hz` times per second. A zero rate is
    /// treated as one tick per second.
    pub fn start(rate_hz: u32) -> Self {
        let period = Duration::from_secs(1) / rate_hz.max(1);
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleep until the next deadline and advance it.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(wait) = self.next.checked_duration_since(now) {
            thread::sleep(wait);
        }
        self.next += self.period;
        if self.next < Instant::now() {
            self.next = Instant::now() + self.period;
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_rate() {
        assert_eq!(Clock::start(10).period(), Duration::from_millis(100));
        assert_eq!(Clock::start(1).period(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_rate_does_not_panic() {
        assert_eq!(Clock::start(0).period(), Duration::from_secs(1));
    }

    #[test]
    fn test_ticks_take_at_least_the_period() {
        let mut clock = Clock::start(100);
        let start = Instant::now();
        clock.tick();
        clock.tick();
        clock.tick();
        // Three 10ms periods; allow generous scheduling slack above
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_recovers_after_a_stall() {
        let mut clock = Clock::start(100);
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        clock.tick();
        // A stalled clock must not return a burst of instant ticks
        clock.tick();
        assert!(start.elapsed() >= Duration::from_millis(8));
    }
}
