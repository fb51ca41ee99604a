//! Time windows and date parsing.
//!
//! All timestamps are naive UTC. Source partitions are keyed by calendar hour
//! and frames by window start, so no time-zone arithmetic is ever needed.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::HeatmapError;
use crate::interval::IntervalLabel;

/// A half-open time span `[start, end)` aggregated into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Window of `interval` length starting at `start`, or `None` when its
    /// end is past the last representable instant.
    pub fn new(start: NaiveDateTime, interval: IntervalLabel) -> Option<Self> {
        let end = start.checked_add_signed(interval.duration())?;
        Some(Self { start, end })
    }

    /// True when `t` falls in `[start, end)`.
    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        t >= &self.start && t < &self.end
    }

    /// Hour boundaries covered by the window, starting at `start`.
    pub fn hours(&self) -> impl Iterator<Item = NaiveDateTime> {
        let end = self.end;
        let mut next = self.start;
        std::iter::from_fn(move || {
            if next >= end {
                return None;
            }
            let current = next;
            next += Duration::hours(1);
            Some(current)
        })
    }

    /// Number of hour boundaries in the window.
    pub fn hour_count(&self) -> usize {
        self.hours().count()
    }
}

/// The sequence of windows tiling `[start, end]` for one interval.
///
/// Windows start at `start` and advance by the interval length while the
/// window start is `<= end`, so the last window may extend past `end`.
/// The plan stops early at a window that would end past `NaiveDateTime::MAX`.
/// Both the progress total and the render walk are derived from this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: IntervalLabel,
}

impl WindowPlan {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, interval: IntervalLabel) -> Self {
        Self {
            start,
            end,
            interval,
        }
    }

    /// Iterate over the windows of this plan.
    pub fn windows(&self) -> impl Iterator<Item = TimeWindow> {
        let plan = *self;
        let mut next = plan.start;
        std::iter::from_fn(move || {
            if next > plan.end {
                return None;
            }
            let window = TimeWindow::new(next, plan.interval)?;
            next = window.end;
            Some(window)
        })
    }

    /// Total number of windows in the plan.
    pub fn len(&self) -> usize {
        self.windows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Parse a user-supplied date or datetime.
///
/// Accepts RFC 3339 (converted to UTC), `YYYY-MM-DDTHH:MM[:SS]`,
/// `YYYY-MM-DD HH:MM[:SS]` and a bare `YYYY-MM-DD` (midnight).
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, HeatmapError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ndt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(ndt);
        }
    }

    Err(HeatmapError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(dt("2024-01-15"), dt("2024-01-15T00:00:00"));
        assert_eq!(dt("2024-01-15 12:30").hour(), 12);
        assert_eq!(dt("2024-01-15T12:00:00Z"), dt("2024-01-15T12:00"));
        assert_eq!(dt("2024-01-15T14:00:00+02:00"), dt("2024-01-15T12:00"));
        assert!(parse_datetime("15/01/2024").is_err());
    }

    #[test]
    fn test_window_hours() {
        let window = TimeWindow::new(dt("2024-01-01"), IntervalLabel::OneDay).unwrap();
        let hours: Vec<_> = window.hours().collect();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0], dt("2024-01-01T00:00"));
        assert_eq!(hours[23], dt("2024-01-01T23:00"));
        assert!(window.contains(&dt("2024-01-01T23:59:59")));
        assert!(!window.contains(&dt("2024-01-02")));
    }

    #[test]
    fn test_plan_three_days() {
        let plan = WindowPlan::new(dt("2024-01-01"), dt("2024-01-03"), IntervalLabel::OneDay);
        let windows: Vec<_> = plan.windows().collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(plan.len(), 3);
        assert_eq!(windows[0].start, dt("2024-01-01"));
        assert_eq!(windows[0].end, dt("2024-01-02"));
        assert_eq!(windows[2].start, dt("2024-01-03"));
        assert_eq!(windows[2].end, dt("2024-01-04"));
    }

    #[test]
    fn test_plan_last_window_overhangs_end() {
        let plan = WindowPlan::new(dt("2024-01-01"), dt("2024-01-10"), IntervalLabel::SevenDays);
        let windows: Vec<_> = plan.windows().collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].start, dt("2024-01-08"));
        assert_eq!(windows[1].end, dt("2024-01-15"));
    }

    #[test]
    fn test_plan_single_instant() {
        let plan = WindowPlan::new(dt("2024-01-01"), dt("2024-01-01"), IntervalLabel::OneMonth);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_plan_stops_before_overflow() {
        let last = NaiveDateTime::MAX;
        assert!(TimeWindow::new(last, IntervalLabel::OneDay).is_none());

        let near_end = last - Duration::days(10);
        let plan = WindowPlan::new(near_end, last, IntervalLabel::SevenDays);
        let windows: Vec<_> = plan.windows().collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, near_end);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_plan_inverted_range_is_empty() {
        let plan = WindowPlan::new(dt("2024-01-05"), dt("2024-01-01"), IntervalLabel::OneDay);
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
