//! Half-open time ranges.
//!
//! Every window in the system is `[start, end)`: the start instant is part of
//! the range, the end instant is not. Two ranges that only share a boundary
//! point do not overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a range would be empty or inverted.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("end time must be after start time")]
pub struct InvalidRange;

/// A half-open interval `[start, end)` over UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidRange)
        }
    }

    /// True when the two ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// True when `instant` falls inside the range (start inclusive, end exclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// The shared sub-range of two overlapping ranges.
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        TimeRange::new(start, end).ok()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn range(start: u32, end: u32) -> TimeRange {
        TimeRange::new(at(start), at(end)).unwrap()
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        assert_eq!(TimeRange::new(at(10), at(10)), Err(InvalidRange));
        assert_eq!(TimeRange::new(at(12), at(10)), Err(InvalidRange));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = range(9, 12);
        let b = range(11, 14);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = range(15, 16);
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let morning = range(8, 10);
        let midday = range(10, 12);
        assert!(!morning.overlaps(&midday));
        assert!(!midday.overlaps(&morning));
    }

    #[test]
    fn contains_is_half_open() {
        let r = range(9, 17);
        assert!(r.contains(at(9)));
        assert!(r.contains(at(16)));
        assert!(!r.contains(at(17)));
        assert!(!r.contains(at(8)));
    }

    #[test]
    fn intersection_of_overlapping_ranges() {
        let a = range(9, 13);
        let b = range(11, 15);
        assert_eq!(a.intersection(&b), Some(range(11, 13)));
        assert_eq!(b.intersection(&a), Some(range(11, 13)));
    }

    #[test]
    fn intersection_of_touching_ranges_is_none() {
        let a = range(9, 11);
        let b = range(11, 13);
        assert_eq!(a.intersection(&b), None);
    }
}
