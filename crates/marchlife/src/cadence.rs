//! Fixed-period tick scheduling.

use std::time::Duration;

/// Decides how many pipeline ticks are due from elapsed wall time.
///
/// The driver owns the clock; this type only does the bookkeeping. When the
/// caller falls more than `max_catch_up` periods behind, the excess ticks are
/// skipped rather than run in a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCadence {
    period: Duration,
    max_catch_up: u32,
    accumulated: Duration,
    skipped: u64,
}

impl FixedCadence {
    /// Default number of ticks run in one catch-up burst.
    pub const DEFAULT_MAX_CATCH_UP: u32 = 4;

    /// Creates a cadence ticking once per `period`.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            max_catch_up: Self::DEFAULT_MAX_CATCH_UP,
            accumulated: Duration::ZERO,
            skipped: 0,
        }
    }

    /// Cadence running `rate` ticks per second.
    #[must_use]
    pub fn per_second(rate: u32) -> Self {
        Self::new(Duration::from_secs(1) / rate.max(1))
    }

    /// Sets the catch-up limit (at least 1).
    #[must_use]
    pub fn with_max_catch_up(mut self, max_catch_up: u32) -> Self {
        self.max_catch_up = max_catch_up.max(1);
        self
    }

    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Total ticks skipped so far.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Adds `elapsed` time and returns the number of ticks to run now.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;
        let period = self.period.as_nanos();
        let due = self.accumulated.as_nanos() / period;
        let remainder = self.accumulated.as_nanos() % period;
        self.accumulated = Duration::from_nanos(u64::try_from(remainder).unwrap_or(u64::MAX));

        let run = due.min(u128::from(self.max_catch_up));
        let skipped = due - run;
        if skipped > 0 {
            let skipped = u64::try_from(skipped).unwrap_or(u64::MAX);
            self.skipped = self.skipped.saturating_add(skipped);
            log::warn!("cadence behind by {skipped} ticks, skipping");
        }
        u32::try_from(run).unwrap_or(self.max_catch_up)
    }

    /// Drops any accumulated time.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_partial_periods() {
        let mut cadence = FixedCadence::new(Duration::from_millis(10));
        assert_eq!(cadence.advance(Duration::from_millis(4)), 0);
        assert_eq!(cadence.advance(Duration::from_millis(4)), 0);
        assert_eq!(cadence.advance(Duration::from_millis(4)), 1);
        assert_eq!(cadence.advance(Duration::from_millis(8)), 1);
    }

    #[test]
    fn test_skips_when_behind() {
        let mut cadence = FixedCadence::new(Duration::from_millis(10)).with_max_catch_up(2);
        assert_eq!(cadence.advance(Duration::from_millis(55)), 2);
        assert_eq!(cadence.skipped(), 3);
        assert_eq!(cadence.advance(Duration::from_millis(5)), 1);
    }

    #[test]
    fn test_per_second() {
        let cadence = FixedCadence::per_second(50);
        assert_eq!(cadence.period(), Duration::from_millis(20));
        assert_eq!(FixedCadence::per_second(0).period(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_period_is_raised() {
        let mut cadence = FixedCadence::new(Duration::ZERO);
        assert_eq!(cadence.period(), Duration::from_millis(1));
        assert_eq!(cadence.advance(Duration::from_millis(3)), 3);
    }
}
