//! Recurring-availability templates and their expansion.
//!
//! Entries are stored as templates (first occurrence plus a rule); nothing is
//! materialized in the database. Query paths call [`expand`] to enumerate the
//! concrete occurrences that fall inside a window and merge them into the
//! result set.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time_range::TimeRange;

/// How often a recurring template repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("recurrence interval must be at least 1")]
    ZeroInterval,
    #[error("day of week {0} is out of range (0-6)")]
    InvalidWeekday(u8),
    #[error("days_of_week only applies to weekly recurrence")]
    DaysWithoutWeekly,
}

/// Recurrence metadata attached to a template entry.
///
/// `days_of_week` uses 0 = Sunday through 6 = Saturday and is only meaningful
/// for weekly rules; an empty list means "the template's own weekday". `until`
/// bounds the series: no occurrence starts after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    pub until: Option<chrono::DateTime<Utc>>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if self.interval == 0 {
            return Err(RecurrenceError::ZeroInterval);
        }
        if !self.days_of_week.is_empty() && self.frequency != Frequency::Weekly {
            return Err(RecurrenceError::DaysWithoutWeekly);
        }
        if let Some(&day) = self.days_of_week.iter().find(|&&d| d > 6) {
            return Err(RecurrenceError::InvalidWeekday(day));
        }
        Ok(())
    }
}

/// Enumerate the concrete occurrences of `template` repeated per `rule` that
/// overlap `window`.
///
/// Every occurrence has the template's duration and time of day, starts no
/// earlier than the template itself, and starts no later than `rule.until`
/// when that is set. Monthly rules anchored on a day a month doesn't have
/// (e.g. the 31st) skip that month.
pub fn expand(rule: &RecurrenceRule, template: &TimeRange, window: &TimeRange) -> Vec<TimeRange> {
    if rule.validate().is_err() {
        return Vec::new();
    }

    match rule.frequency {
        Frequency::Daily => expand_daily(rule, template, window),
        Frequency::Weekly => expand_weekly(rule, template, window),
        Frequency::Monthly => expand_monthly(rule, template, window),
    }
}

fn push_if_live(
    out: &mut Vec<TimeRange>,
    occurrence: TimeRange,
    rule: &RecurrenceRule,
    template: &TimeRange,
    window: &TimeRange,
) {
    if occurrence.start < template.start {
        return;
    }
    if let Some(until) = rule.until {
        if occurrence.start > until {
            return;
        }
    }
    if occurrence.overlaps(window) {
        out.push(occurrence);
    }
}

fn expand_daily(rule: &RecurrenceRule, template: &TimeRange, window: &TimeRange) -> Vec<TimeRange> {
    let mut out = Vec::new();
    let duration = template.duration();
    let step = rule.interval as i64;

    // Jump close to the window start instead of walking from the template.
    let lead = (window.start - duration - template.start).num_days();
    let mut period = if lead > 0 { lead / step } else { 0 };

    loop {
        let start = template.start + Duration::days(period * step);
        if start >= window.end {
            break;
        }
        if let Some(until) = rule.until {
            if start > until {
                break;
            }
        }
        let end = start + duration;
        push_if_live(&mut out, TimeRange { start, end }, rule, template, window);
        period += 1;
    }
    out
}

fn expand_weekly(
    rule: &RecurrenceRule,
    template: &TimeRange,
    window: &TimeRange,
) -> Vec<TimeRange> {
    let mut out = Vec::new();
    let duration = template.duration();
    let time_of_day = template.start.time();
    let template_date = template.start.date_naive();

    // Weeks are counted from the Sunday of the template's week, so an
    // every-other-week rule with multiple weekdays keeps them in lockstep.
    let anchor_week = week_start(template_date);

    // Extra leading day so an occurrence that begins before the window but
    // spills into it is still found.
    let span_lead = duration.num_days() + 1;
    let mut date = template_date.max(window.start.date_naive() - Duration::days(span_lead));
    let last_date = window.end.date_naive();

    while date <= last_date {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        let on_rule_day = if rule.days_of_week.is_empty() {
            date.weekday() == template_date.weekday()
        } else {
            rule.days_of_week.contains(&weekday)
        };

        if on_rule_day {
            let week_offset = (week_start(date) - anchor_week).num_days() / 7;
            if week_offset % rule.interval as i64 == 0 {
                let start = Utc.from_utc_datetime(&date.and_time(time_of_day));
                let end = start + duration;
                push_if_live(&mut out, TimeRange { start, end }, rule, template, window);
            }
        }
        date = date + Duration::days(1);
    }
    out
}

fn expand_monthly(
    rule: &RecurrenceRule,
    template: &TimeRange,
    window: &TimeRange,
) -> Vec<TimeRange> {
    let mut out = Vec::new();
    let duration = template.duration();
    let anchor = template.start;
    let time_of_day = anchor.time();
    let anchor_months = anchor.year() * 12 + anchor.month0() as i32;

    let mut period: i32 = 0;
    loop {
        let total = anchor_months + period * rule.interval as i32;
        let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);

        let month_head = match NaiveDate::from_ymd_opt(year, month0 + 1, 1) {
            Some(d) => d,
            None => break,
        };
        if Utc.from_utc_datetime(&month_head.and_time(time_of_day)) >= window.end {
            break;
        }

        // Months without the anchor day (e.g. day 31) contribute nothing.
        if let Some(date) = NaiveDate::from_ymd_opt(year, month0 + 1, anchor.day()) {
            let start = Utc.from_utc_datetime(&date.and_time(time_of_day));
            if let Some(until) = rule.until {
                if start > until {
                    break;
                }
            }
            let end = start + duration;
            push_if_live(&mut out, TimeRange { start, end }, rule, template, window);
        }
        period += 1;
    }
    out
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn ts(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    fn weekly(days: Vec<u8>, interval: u32, until: Option<DateTime<Utc>>) -> RecurrenceRule {
        RecurrenceRule {
            frequency: Frequency::Weekly,
            interval,
            days_of_week: days,
            until,
        }
    }

    #[test]
    fn daily_expansion_fills_the_window() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: vec![],
            until: None,
        };
        // 18:00-20:00 every day, queried over four days.
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        let window = range(ts(2024, 3, 4, 0), ts(2024, 3, 8, 0));

        let occurrences = expand(&rule, &template, &window);
        assert_eq!(occurrences.len(), 4);
        assert_eq!(occurrences[0].start, ts(2024, 3, 4, 18));
        assert_eq!(occurrences[3].start, ts(2024, 3, 7, 18));
    }

    #[test]
    fn daily_interval_skips_days() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 3,
            days_of_week: vec![],
            until: None,
        };
        let template = range(ts(2024, 3, 1, 9), ts(2024, 3, 1, 10));
        let window = range(ts(2024, 3, 1, 0), ts(2024, 3, 10, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        assert_eq!(
            starts,
            vec![ts(2024, 3, 1, 9), ts(2024, 3, 4, 9), ts(2024, 3, 7, 9)]
        );
    }

    #[test]
    fn weekly_by_weekday_expansion() {
        // Template anchored on Monday 2024-03-04, repeating Mon/Wed/Fri.
        let rule = weekly(vec![1, 3, 5], 1, None);
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        let window = range(ts(2024, 3, 4, 0), ts(2024, 3, 11, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        assert_eq!(
            starts,
            vec![ts(2024, 3, 4, 18), ts(2024, 3, 6, 18), ts(2024, 3, 8, 18)]
        );
    }

    #[test]
    fn weekly_without_days_uses_template_weekday() {
        let rule = weekly(vec![], 1, None);
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        let window = range(ts(2024, 3, 1, 0), ts(2024, 3, 22, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        // Three Mondays inside the window, none before the template.
        assert_eq!(
            starts,
            vec![ts(2024, 3, 4, 18), ts(2024, 3, 11, 18), ts(2024, 3, 18, 18)]
        );
    }

    #[test]
    fn weekly_interval_two_skips_alternate_weeks() {
        let rule = weekly(vec![1], 2, None);
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        let window = range(ts(2024, 3, 4, 0), ts(2024, 4, 2, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        assert_eq!(
            starts,
            vec![ts(2024, 3, 4, 18), ts(2024, 3, 18, 18), ts(2024, 4, 1, 18)]
        );
    }

    #[test]
    fn until_truncates_the_series() {
        let rule = weekly(vec![1], 1, Some(ts(2024, 3, 11, 18)));
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        let window = range(ts(2024, 3, 4, 0), ts(2024, 4, 1, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        // The 2024-03-11 occurrence starts exactly at `until` and is kept;
        // everything after is cut.
        assert_eq!(starts, vec![ts(2024, 3, 4, 18), ts(2024, 3, 11, 18)]);
    }

    #[test]
    fn monthly_day_31_skips_short_months() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 1,
            days_of_week: vec![],
            until: None,
        };
        let template = range(ts(2024, 1, 31, 12), ts(2024, 1, 31, 14));
        let window = range(ts(2024, 1, 1, 0), ts(2024, 6, 1, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        // February and April lack a 31st.
        assert_eq!(
            starts,
            vec![ts(2024, 1, 31, 12), ts(2024, 3, 31, 12), ts(2024, 5, 31, 12)]
        );
    }

    #[test]
    fn monthly_interval_skips_months() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 2,
            days_of_week: vec![],
            until: None,
        };
        let template = range(ts(2024, 1, 15, 12), ts(2024, 1, 15, 13));
        let window = range(ts(2024, 1, 1, 0), ts(2024, 7, 1, 0));

        let starts: Vec<_> = expand(&rule, &template, &window)
            .into_iter()
            .map(|o| o.start)
            .collect();
        assert_eq!(
            starts,
            vec![ts(2024, 1, 15, 12), ts(2024, 3, 15, 12), ts(2024, 5, 15, 12)]
        );
    }

    #[test]
    fn no_occurrences_before_the_template_start() {
        let rule = weekly(vec![1], 1, None);
        let template = range(ts(2024, 3, 4, 18), ts(2024, 3, 4, 20));
        // Window entirely before the template.
        let window = range(ts(2024, 2, 1, 0), ts(2024, 3, 1, 0));

        assert!(expand(&rule, &template, &window).is_empty());
    }

    #[test]
    fn validation_rejects_bad_rules() {
        assert_eq!(
            weekly(vec![7], 1, None).validate(),
            Err(RecurrenceError::InvalidWeekday(7))
        );
        assert_eq!(
            weekly(vec![1], 0, None).validate(),
            Err(RecurrenceError::ZeroInterval)
        );
        let daily_with_days = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: vec![1],
            until: None,
        };
        assert_eq!(
            daily_with_days.validate(),
            Err(RecurrenceError::DaysWithoutWeekly)
        );
    }
}
