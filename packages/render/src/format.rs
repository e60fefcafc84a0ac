//! One-line formatters for incidents and aggregate rows.
//!
//! Placeholders are fixed: a percentage of nothing is `0%` and a missing
//! average is [`NO_DATA`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use incident_watch_analytics_models::{
    DailyStat, Hotspot, HourlyStat, TypeStat, ViolentHourStat, WindowSummary,
};
use incident_watch_database_models::StoredIncident;
use incident_watch_incident_models::Incident;

/// Placeholder for an empty section or a missing value.
pub const NO_DATA: &str = "no data";

/// Formats `part / whole` as a whole-number percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0%".to_string();
    }
    format!("{:.0}%", part as f64 * 100.0 / whole as f64)
}

/// Formats a number of seconds as `1h 05m`, `42m` or `30s`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn duration(secs: f64) -> String {
    let secs = secs.max(0.0).round() as i64;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// Formats an optional average duration, [`NO_DATA`] when absent.
#[must_use]
pub fn avg_duration(secs: Option<f64>) -> String {
    secs.map_or_else(|| NO_DATA.to_string(), duration)
}

/// Local `HH:MM` of a timestamp.
#[must_use]
pub fn local_time(at: DateTime<Utc>, tz: &Tz) -> String {
    at.with_timezone(tz).format("%H:%M").to_string()
}

/// Local `YYYY-MM-DD` of a timestamp.
#[must_use]
pub fn local_date(at: DateTime<Utc>, tz: &Tz) -> String {
    at.with_timezone(tz).format("%Y-%m-%d").to_string()
}

fn place(location: Option<&str>, city: Option<&str>) -> String {
    match (location, city) {
        (Some(location), Some(city)) => format!("{location}, {city}"),
        (Some(location), None) => location.to_string(),
        (None, Some(city)) => city.to_string(),
        (None, None) => "unknown location".to_string(),
    }
}

/// `14:32 FIGHT/ASSAULT @ 2600 8TH AVE S, NASHVILLE`
#[must_use]
pub fn incident_line(incident: &Incident, tz: &Tz) -> String {
    format!(
        "{} {} @ {}",
        local_time(incident.received_at, tz),
        incident.type_name,
        place(incident.location.as_deref(), incident.city.as_deref()),
    )
}

/// Like [`incident_line`] for a stored row, with its lifecycle state.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stored_incident_line(incident: &StoredIncident, tz: &Tz) -> String {
    let state = incident.active_duration_secs().map_or_else(
        || "active".to_string(),
        |secs| format!("cleared after {}", duration(secs as f64)),
    );
    format!(
        "{} {} {} @ {} ({state})",
        local_date(incident.received_at, tz),
        local_time(incident.received_at, tz),
        incident.type_name,
        place(incident.location.as_deref(), incident.city.as_deref()),
    )
}

/// `Total 120 | violent 14 (12%) | cleared 110 (92%) | noise 6 | avg clear 42m`
#[must_use]
pub fn summary_line(summary: &WindowSummary) -> String {
    format!(
        "Total {} | violent {} ({}) | cleared {} ({}) | noise {} | avg clear {}",
        summary.total,
        summary.violent,
        percent(summary.violent, summary.total),
        summary.cleared,
        percent(summary.cleared, summary.total),
        summary.noise,
        avg_duration(summary.avg_clear_secs),
    )
}

/// `1. TRAFFIC ACCIDENT: 30 (avg clear 35m)`
#[must_use]
pub fn type_stat_line(rank: usize, stat: &TypeStat) -> String {
    format!(
        "{rank}. {}: {} (avg clear {})",
        stat.type_name,
        stat.count,
        avg_duration(stat.avg_clear_secs),
    )
}

/// `2024-01-15: 20 (3 violent)`
#[must_use]
pub fn daily_line(stat: &DailyStat) -> String {
    format!("{}: {} ({} violent)", stat.date, stat.count, stat.violent)
}

/// `17:00: 12 (2 violent)`
#[must_use]
pub fn hourly_line(stat: &HourlyStat) -> String {
    format!("{:02}:00: {} ({} violent)", stat.hour, stat.count, stat.violent)
}

/// `1. 8TH AVE S, NASHVILLE: 4`
#[must_use]
pub fn hotspot_line(rank: usize, hotspot: &Hotspot) -> String {
    format!(
        "{rank}. {}: {}",
        place(Some(&hotspot.street), hotspot.city.as_deref()),
        hotspot.count,
    )
}

/// `02:00 SHOOTING: 2`
#[must_use]
pub fn violent_hour_line(stat: &ViolentHourStat) -> String {
    format!("{:02}:00 {}: {}", stat.hour, stat.type_name, stat.count)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn chicago() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    #[test]
    fn percent_of_zero_is_zero() {
        assert_eq!(percent(0, 0), "0%");
        assert_eq!(percent(5, 0), "0%");
        assert_eq!(percent(1, 3), "33%");
        assert_eq!(percent(2, 3), "67%");
        assert_eq!(percent(4, 4), "100%");
    }

    #[test]
    fn durations() {
        assert_eq!(duration(30.0), "30s");
        assert_eq!(duration(42.0 * 60.0), "42m");
        assert_eq!(duration(3900.0), "1h 05m");
        assert_eq!(duration(-5.0), "0s");
        assert_eq!(avg_duration(None), NO_DATA);
    }

    #[test]
    fn incident_line_uses_local_time() {
        let incident = Incident {
            id: "1".to_string(),
            type_code: "73".to_string(),
            type_name: "FIGHT/ASSAULT".to_string(),
            location: Some("2600 8TH AVE S".to_string()),
            location_description: None,
            city: Some("NASHVILLE".to_string()),
            received_at: Utc.with_ymd_and_hms(2024, 1, 15, 20, 32, 0).unwrap(),
        };
        assert_eq!(
            incident_line(&incident, &chicago()),
            "14:32 FIGHT/ASSAULT @ 2600 8TH AVE S, NASHVILLE"
        );
    }

    #[test]
    fn stored_line_shows_state() {
        let received = Utc.with_ymd_and_hms(2024, 1, 15, 20, 32, 0).unwrap();
        let mut stored = StoredIncident {
            incident_id: "1".to_string(),
            received_at: received,
            type_code: String::new(),
            type_name: "ALARM".to_string(),
            location: None,
            location_description: None,
            city: None,
            first_seen_at: received,
            last_seen_at: received,
            cleared: false,
            cleared_at: None,
            street: None,
            hour_bucket: Some(14),
            local_date: Some("2024-01-15".to_string()),
        };
        assert_eq!(
            stored_incident_line(&stored, &chicago()),
            "2024-01-15 14:32 ALARM @ unknown location (active)"
        );

        stored.cleared = true;
        stored.cleared_at = Some(received + chrono::Duration::minutes(42));
        assert!(stored_incident_line(&stored, &chicago()).ends_with("(cleared after 42m)"));
    }

    #[test]
    fn summary_line_with_empty_window() {
        assert_eq!(
            summary_line(&WindowSummary::default()),
            "Total 0 | violent 0 (0%) | cleared 0 (0%) | noise 0 | avg clear no data"
        );
    }

    #[test]
    fn aggregate_lines() {
        assert_eq!(
            hourly_line(&HourlyStat {
                hour: 7,
                count: 12,
                violent: 2
            }),
            "07:00: 12 (2 violent)"
        );
        assert_eq!(
            hotspot_line(
                1,
                &Hotspot {
                    street: "8TH AVE S".to_string(),
                    city: Some("NASHVILLE".to_string()),
                    count: 4,
                }
            ),
            "1. 8TH AVE S, NASHVILLE: 4"
        );
    }
}
