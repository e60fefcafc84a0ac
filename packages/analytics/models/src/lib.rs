#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation result types.
//!
//! Every aggregate is computed over a [`TimeWindow`] of `received_at`
//! values. The types here carry no query logic; they are what the
//! aggregator returns and what the renderer formats.

use chrono::{DateTime, Days, Duration, TimeZone as _, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range of receipt times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The trailing `hours` ending at `now`.
    #[must_use]
    pub fn trailing_hours(hours: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(i64::from(hours)),
            end: now,
        }
    }

    /// A reporting period covering `days` whole local days before today,
    /// plus today so far.
    ///
    /// The start is local midnight in `tz`, so every report generated on the
    /// same local day shares one period start.
    #[must_use]
    pub fn report_period(days: u32, now: DateTime<Utc>, tz: &Tz) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let first_day = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(today);
        let midnight = first_day.and_time(chrono::NaiveTime::MIN);
        let start = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| Utc.from_utc_datetime(&midnight), |t| t.with_timezone(&Utc));

        Self { start, end: now }
    }

    /// Length of the window in whole hours.
    #[must_use]
    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

/// Count and clear time for one incident type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStat {
    /// Incident type name as reported by the feed.
    pub type_name: String,
    /// Occurrences in the window.
    pub count: u64,
    /// Mean seconds from receipt to clear over cleared occurrences, if any.
    pub avg_clear_secs: Option<f64>,
}

/// Counts for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    /// Local date, `YYYY-MM-DD`.
    pub date: String,
    /// Occurrences on that day.
    pub count: u64,
    /// Violent occurrences on that day.
    pub violent: u64,
}

/// Counts for one local hour of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyStat {
    /// Local hour, 0-23.
    pub hour: u8,
    /// Occurrences in that hour.
    pub count: u64,
    /// Violent occurrences in that hour.
    pub violent: u64,
}

/// A street ranked by violent occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Normalized street name.
    pub street: String,
    /// City, when the feed reported one.
    pub city: Option<String>,
    /// Violent occurrences on this street.
    pub count: u64,
}

/// Violent occurrences of one type in one local hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolentHourStat {
    /// Local hour, 0-23.
    pub hour: u8,
    /// Incident type name.
    pub type_name: String,
    /// Occurrences.
    pub count: u64,
}

/// Headline counters for a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    /// All occurrences received in the window.
    pub total: u64,
    /// Violent-classified occurrences.
    pub violent: u64,
    /// Occurrences that have since cleared.
    pub cleared: u64,
    /// Noise-classified occurrences.
    pub noise: u64,
    /// Mean seconds from receipt to clear, if anything cleared.
    pub avg_clear_secs: Option<f64>,
}

/// Everything a weekly report shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    /// Period covered.
    pub window: TimeWindow,
    /// Headline counters.
    pub summary: WindowSummary,
    /// Top types, noise excluded.
    pub top_types: Vec<TypeStat>,
    /// Per-day counts, most recent first.
    pub daily: Vec<DailyStat>,
    /// Busiest hours, most occurrences first.
    pub peak_hours: Vec<HourlyStat>,
    /// Streets with the most violent occurrences.
    pub hotspots: Vec<Hotspot>,
    /// Violent occurrences by hour and type.
    pub violent_by_hour: Vec<ViolentHourStat>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn chicago() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    #[test]
    fn trailing_window_ends_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let window = TimeWindow::trailing_hours(24, now);
        assert_eq!(window.end, now);
        assert_eq!(window.hours(), 24);
    }

    #[test]
    fn report_period_starts_at_local_midnight() {
        // 2024-01-15 03:00 UTC is still 2024-01-14 in Chicago.
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap();
        let window = TimeWindow::report_period(7, now, &chicago());
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 1, 7, 6, 0, 0).unwrap()
        );
        assert_eq!(window.end, now);
    }

    #[test]
    fn report_period_is_stable_within_a_local_day() {
        let morning = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 1, 16, 4, 0, 0).unwrap();
        assert_eq!(
            TimeWindow::report_period(7, morning, &chicago()).start,
            TimeWindow::report_period(7, evening, &chicago()).start
        );
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary = WindowSummary {
            avg_clear_secs: Some(90.0),
            ..WindowSummary::default()
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"avgClearSecs\":90.0"));
    }
}
