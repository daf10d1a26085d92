//! Randomized retry delays.
//!
//! Many clients watching the same resource kind reconnect at the same moment
//! after an API server hiccup. Drawing every retry delay uniformly from a
//! range spreads those reconnects out without the unbounded growth of
//! exponential backoff.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// A `[min, max]` range of durations that yields a fresh random value on
/// every call to [`TimeRange::random`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    min: Duration,
    max: Duration,
}

impl TimeRange {
    /// Builds a range of `min * unit ..= max * unit`.
    ///
    /// Bounds given in the wrong order are swapped.
    pub fn new(unit: Duration, min: u32, max: u32) -> Self {
        Self::from_bounds(unit * min, unit * max)
    }

    /// Builds a range from two durations, swapping them if `min > max`.
    pub fn from_bounds(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns a duration drawn uniformly from the range.
    pub fn random(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let nanos = rand::rng().random_range(self.min.as_nanos()..=self.max.as_nanos());
        // max fits in a Duration, so every value in between does too
        Duration::new(
            (nanos / 1_000_000_000) as u64,
            (nanos % 1_000_000_000) as u32,
        )
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn samples_stay_within_bounds() {
        let range = TimeRange::new(Duration::from_millis(1), 250, 750);
        let samples: Vec<Duration> = (0..10_000).map(|_| range.random()).collect();

        for sample in &samples {
            assert!(
                *sample >= Duration::from_millis(250) && *sample <= Duration::from_millis(750),
                "sample {sample:?} escaped the range"
            );
        }

        let distinct: HashSet<_> = samples.iter().collect();
        assert!(distinct.len() > 1, "samples should not all be identical");
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let range = TimeRange::new(Duration::from_secs(1), 5, 2);
        assert_eq!(range.min(), Duration::from_secs(2));
        assert_eq!(range.max(), Duration::from_secs(5));
    }

    #[test]
    fn degenerate_range_is_constant() {
        let range = TimeRange::from_bounds(Duration::from_millis(40), Duration::from_millis(40));
        for _ in 0..100 {
            assert_eq!(range.random(), Duration::from_millis(40));
        }
    }

    #[test]
    fn display_shows_both_bounds() {
        let range = TimeRange::new(Duration::from_millis(1), 250, 750);
        assert_eq!(range.to_string(), "[250ms, 750ms]");
    }
}
