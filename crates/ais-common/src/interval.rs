//! Named frame intervals.
//!
//! Every frame aggregates a fixed number of hours selected by a
//! human-readable label. The label doubles as the name of the frame
//! directory, so its text form must never change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HeatmapError;

/// The fixed set of aggregation intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IntervalLabel {
    OneDay,
    ThreeDays,
    FiveDays,
    SevenDays,
    FourteenDays,
    OneMonth,
}

impl IntervalLabel {
    /// All intervals in ascending order of length.
    pub fn all() -> &'static [IntervalLabel] {
        &[
            IntervalLabel::OneDay,
            IntervalLabel::ThreeDays,
            IntervalLabel::FiveDays,
            IntervalLabel::SevenDays,
            IntervalLabel::FourteenDays,
            IntervalLabel::OneMonth,
        ]
    }

    /// Display label, also used as the frame directory name.
    pub fn label(&self) -> &'static str {
        match self {
            IntervalLabel::OneDay => "1 Day",
            IntervalLabel::ThreeDays => "3 Days",
            IntervalLabel::FiveDays => "5 Days",
            IntervalLabel::SevenDays => "7 Days",
            IntervalLabel::FourteenDays => "14 Days",
            IntervalLabel::OneMonth => "1 Month",
        }
    }

    /// Window length in hours.
    pub fn hours(&self) -> u32 {
        match self {
            IntervalLabel::OneDay => 24,
            IntervalLabel::ThreeDays => 72,
            IntervalLabel::FiveDays => 120,
            IntervalLabel::SevenDays => 168,
            IntervalLabel::FourteenDays => 336,
            // a "month" is a flat 30 days
            IntervalLabel::OneMonth => 720,
        }
    }

    /// Window length as a chrono duration.
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.hours()))
    }
}

impl fmt::Display for IntervalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IntervalLabel {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntervalLabel::all()
            .iter()
            .copied()
            .find(|interval| interval.label() == s)
            .ok_or_else(|| HeatmapError::UnsupportedInterval(s.to_string()))
    }
}

impl TryFrom<String> for IntervalLabel {
    type Error = HeatmapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IntervalLabel> for String {
    fn from(value: IntervalLabel) -> Self {
        value.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for interval in IntervalLabel::all() {
            let parsed: IntervalLabel = interval.label().parse().unwrap();
            assert_eq!(parsed, *interval);
        }
    }

    #[test]
    fn test_hours() {
        let hours: Vec<u32> = IntervalLabel::all().iter().map(|i| i.hours()).collect();
        assert_eq!(hours, vec![24, 72, 120, 168, 336, 720]);
    }

    #[test]
    fn test_unknown_label() {
        let err = "2 Days".parse::<IntervalLabel>().unwrap_err();
        assert!(matches!(err, HeatmapError::UnsupportedInterval(ref s) if s == "2 Days"));
        assert_eq!(err.to_string(), "Unsupported interval: 2 Days");
    }

    #[test]
    fn test_label_is_case_sensitive() {
        assert!("1 day".parse::<IntervalLabel>().is_err());
    }
}
