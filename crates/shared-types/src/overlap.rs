//! Multi-way interval intersection.
//!
//! The overlap endpoint returns per-user candidate lists, but it also computes
//! the windows where everyone is simultaneously free: a boundary sweep over
//! the per-user lists, reporting sub-ranges covered by all `k` users. The
//! half-open convention carries through, so a range ending at `t` and one
//! starting at `t` never produce a common window.

use crate::time_range::TimeRange;

/// Merge a single user's ranges into a minimal sorted set.
///
/// Overlapping and touching ranges collapse together so the sweep counts each
/// user at most once per instant.
pub fn normalize(mut ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Sub-ranges covered by every one of the given users' range lists.
///
/// Returns an empty list when `per_user` is empty.
pub fn intersect_all(per_user: &[Vec<TimeRange>]) -> Vec<TimeRange> {
    if per_user.is_empty() {
        return Vec::new();
    }
    let k = per_user.len();

    // Boundary events: +1 at each start, -1 at each end. Ends sort before
    // starts at the same instant, which is exactly the half-open tie-break.
    let mut events: Vec<(chrono::DateTime<chrono::Utc>, i32)> = Vec::new();
    for ranges in per_user {
        for range in normalize(ranges.clone()) {
            events.push((range.start, 1));
            events.push((range.end, -1));
        }
    }
    events.sort_by_key(|&(at, delta)| (at, delta));

    let mut covered = 0;
    let mut open_at = None;
    let mut out = Vec::new();
    for (at, delta) in events {
        covered += delta;
        if covered == k as i32 && open_at.is_none() {
            open_at = Some(at);
        } else if covered < k as i32 {
            if let Some(start) = open_at.take() {
                if let Ok(range) = TimeRange::new(start, at) {
                    out.push(range);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, min, 0).unwrap()
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    #[test]
    fn normalize_merges_overlapping_and_touching() {
        let merged = normalize(vec![
            range((9, 0), (11, 0)),
            range((10, 0), (12, 0)),
            range((12, 0), (13, 0)),
            range((15, 0), (16, 0)),
        ]);
        assert_eq!(merged, vec![range((9, 0), (13, 0)), range((15, 0), (16, 0))]);
    }

    #[test]
    fn two_users_share_the_middle() {
        let a = vec![range((18, 0), (22, 0))];
        let b = vec![range((20, 0), (23, 0))];
        assert_eq!(intersect_all(&[a, b]), vec![range((20, 0), (22, 0))]);
    }

    #[test]
    fn three_users_narrow_the_window() {
        let a = vec![range((18, 0), (22, 0))];
        let b = vec![range((19, 0), (23, 0))];
        let c = vec![range((17, 0), (20, 30))];
        assert_eq!(intersect_all(&[a, b, c]), vec![range((19, 0), (20, 30))]);
    }

    #[test]
    fn touching_boundaries_produce_no_window() {
        let a = vec![range((18, 0), (20, 0))];
        let b = vec![range((20, 0), (22, 0))];
        assert!(intersect_all(&[a, b]).is_empty());
    }

    #[test]
    fn split_coverage_yields_multiple_windows() {
        let a = vec![range((9, 0), (12, 0)), range((14, 0), (18, 0))];
        let b = vec![range((10, 0), (16, 0))];
        assert_eq!(
            intersect_all(&[a, b]),
            vec![range((10, 0), (12, 0)), range((14, 0), (16, 0))]
        );
    }

    #[test]
    fn user_with_no_ranges_blocks_everything() {
        let a = vec![range((9, 0), (12, 0))];
        let b = vec![];
        assert!(intersect_all(&[a, b]).is_empty());
    }

    #[test]
    fn single_user_gets_their_own_merged_ranges() {
        let a = vec![range((9, 0), (11, 0)), range((10, 0), (12, 0))];
        assert_eq!(intersect_all(&[a]), vec![range((9, 0), (12, 0))]);
    }
}
