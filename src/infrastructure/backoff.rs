use crate::types::BACKOFF_JITTER_RATIO;
use rand::Rng;
use std::time::Duration;

/// Delay computation for reconnection attempts.
///
/// Attempt `n` (1-indexed) waits `min(base * 2^(n-1), max)` plus a uniform
/// jitter of up to 10% of that value, so a fleet of clients dropped by the
/// same outage does not retry in lockstep. Timer arming is the manager's
/// job; this type only computes delays.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectSchedule {
    base: Duration,
    max: Duration,
}

impl ReconnectSchedule {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Backoff delay for the given attempt, before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let scaled = self
            .base
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX);
        scaled.min(self.max)
    }

    /// Backoff delay for the given attempt with jitter applied.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        let jitter = delay.mul_f64(rand::rng().random_range(0.0..BACKOFF_JITTER_RATIO));
        delay + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> ReconnectSchedule {
        ReconnectSchedule::new(Duration::from_millis(1000), Duration::from_millis(30_000))
    }

    #[test]
    fn doubles_per_attempt_until_ceiling() {
        let s = schedule();
        assert_eq!(s.delay_for(1), Duration::from_millis(1000));
        assert_eq!(s.delay_for(2), Duration::from_millis(2000));
        assert_eq!(s.delay_for(3), Duration::from_millis(4000));
        assert_eq!(s.delay_for(4), Duration::from_millis(8000));
        assert_eq!(s.delay_for(5), Duration::from_millis(16_000));
        assert_eq!(s.delay_for(6), Duration::from_millis(30_000));
        assert_eq!(s.delay_for(7), Duration::from_millis(30_000));
    }

    #[test]
    fn delays_are_non_decreasing() {
        let s = schedule();
        let mut previous = Duration::ZERO;
        for attempt in 1..=20 {
            let delay = s.delay_for(attempt);
            assert!(delay >= previous, "delay regressed at attempt {attempt}");
            previous = delay;
        }
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let s = schedule();
        assert_eq!(s.delay_for(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let s = schedule();
        for _ in 0..200 {
            let jittered = s.jittered_delay_for(3);
            let base = s.delay_for(3);
            assert!(jittered >= base);
            assert!(jittered <= base + base.mul_f64(BACKOFF_JITTER_RATIO));
        }
    }
}
