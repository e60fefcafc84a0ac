//! Periodic report assembly, rendering and archiving.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use incident_watch_analytics_models::{TimeWindow, WeeklyReport};
use incident_watch_database::{duckdb::Connection, reports};
use incident_watch_database_models::ReportRecord;
use incident_watch_incident_models::Classifier;
use incident_watch_render::report::render_report;

use crate::{AnalyticsError, stats};

/// Shape of a generated report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Title line prefix.
    pub title: String,
    /// Whole local days before today covered by the report.
    pub days: u32,
    /// Rows per ranked section.
    pub top_n: u32,
    /// Character budget of the rendered text.
    pub budget: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Weekly incident report".to_string(),
            days: 7,
            top_n: 5,
            budget: 2000,
        }
    }
}

/// Gathers every section of a report over `window`.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if any query fails.
pub fn build_report(
    conn: &Connection,
    classifier: &Classifier,
    window: &TimeWindow,
    top_n: u32,
) -> Result<WeeklyReport, AnalyticsError> {
    let summary = stats::summary(conn, window, classifier)?;
    let top_types = stats::type_stats(conn, window, classifier, top_n, true)?;
    let daily = stats::daily_stats(conn, window, classifier)?;
    let hotspots = stats::hotspot_streets(conn, window, classifier, top_n)?;
    let violent_by_hour = stats::violent_by_hour(conn, window, classifier)?;

    let mut peak_hours = stats::hourly_stats(conn, window, classifier)?;
    peak_hours.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    peak_hours.truncate(usize::try_from(top_n).unwrap_or(usize::MAX));

    Ok(WeeklyReport {
        window: *window,
        summary,
        top_types,
        daily,
        peak_hours,
        hotspots,
        violent_by_hour,
    })
}

/// Builds, renders and archives the report for the period ending at
/// `now`.
///
/// The period starts at local midnight, so regenerating a report on the
/// same local day replaces the archived one.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a query, serialization or the archive
/// write fails.
pub fn generate_weekly_report(
    conn: &Connection,
    classifier: &Classifier,
    tz: &Tz,
    now: DateTime<Utc>,
    options: &ReportOptions,
) -> Result<ReportRecord, AnalyticsError> {
    let window = TimeWindow::report_period(options.days, now, tz);
    let report = build_report(conn, classifier, &window, options.top_n)?;
    let rendered = render_report(&options.title, &report, tz, options.budget);

    if rendered.is_truncated() {
        log::info!(
            "Report truncated to fit {} chars: {} lines omitted",
            options.budget,
            rendered.omitted
        );
    }

    let record = ReportRecord {
        period_start: window.start,
        period_end: window.end,
        text: rendered.text,
        total: report.summary.total,
        violent: report.summary.violent,
        cleared: report.summary.cleared,
        noise: report.summary.noise,
        top_streets_json: serde_json::to_string(&report.hotspots)?,
        peak_hours_json: serde_json::to_string(&report.peak_hours)?,
        created_at: now,
    };

    reports::save_report(conn, &record)?;
    log::info!(
        "Archived report for {} ({} incidents)",
        window.start.with_timezone(tz).format("%Y-%m-%d"),
        record.total
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};
    use incident_watch_analytics_models::{Hotspot, HourlyStat};
    use incident_watch_database::{incidents, open_in_memory};
    use incident_watch_incident_models::Incident;

    use super::*;

    fn tz() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
    }

    fn incident(id: &str, type_name: &str, location: &str, hours_ago: i64) -> Incident {
        Incident {
            id: id.to_string(),
            type_code: String::new(),
            type_name: type_name.to_string(),
            location: Some(location.to_string()),
            location_description: None,
            city: None,
            received_at: now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn report_rerun_overwrites_same_period() {
        let conn = open_in_memory().unwrap();
        let rows = [
            incident("1", "SHOOTING", "100 8TH AVE S", 3),
            incident("2", "ALARM", "1 MAIN ST", 5),
        ];
        let _ = incidents::record_occurrences(&conn, &rows, now(), &tz());

        let options = ReportOptions::default();
        let first = generate_weekly_report(&conn, &Classifier::default(), &tz(), now(), &options)
            .unwrap();
        assert_eq!(first.total, 2);
        assert_eq!(first.violent, 1);

        let _ = incidents::record_occurrences(
            &conn,
            &[incident("3", "FIGHT", "200 8TH AVE S", 1)],
            now(),
            &tz(),
        );
        let later = now() + Duration::hours(2);
        let second =
            generate_weekly_report(&conn, &Classifier::default(), &tz(), later, &options).unwrap();
        assert_eq!(second.period_start, first.period_start);
        assert_eq!(second.total, 3);

        let archived = reports::latest_reports(&conn, 10).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].total, 3);

        let streets: Vec<Hotspot> = serde_json::from_str(&archived[0].top_streets_json).unwrap();
        assert_eq!(streets[0].street, "8TH AVE S");
        assert_eq!(streets[0].count, 2);
    }

    #[test]
    fn empty_store_produces_placeholder_report() {
        let conn = open_in_memory().unwrap();
        let record = generate_weekly_report(
            &conn,
            &Classifier::default(),
            &tz(),
            now(),
            &ReportOptions::default(),
        )
        .unwrap();
        assert_eq!(record.total, 0);
        assert!(record.text.contains("violent 0 (0%)"));
        assert!(record.text.contains("no data"));
        assert_eq!(record.top_streets_json, "[]");
    }

    #[test]
    fn report_text_respects_budget() {
        let conn = open_in_memory().unwrap();
        let rows: Vec<Incident> = (0..200)
            .map(|i| {
                incident(
                    &i.to_string(),
                    &format!("SHOOTING TYPE {i}"),
                    &format!("{i} STREET NUMBER {i}"),
                    i64::from(i % 100),
                )
            })
            .collect();
        let _ = incidents::record_occurrences(&conn, &rows, now(), &tz());

        let options = ReportOptions {
            budget: 300,
            top_n: 50,
            ..ReportOptions::default()
        };
        let record =
            generate_weekly_report(&conn, &Classifier::default(), &tz(), now(), &options).unwrap();
        assert!(record.text.chars().count() <= 300);
        assert!(record.text.contains("more"));
    }

    #[test]
    fn peak_hours_sorted_by_count() {
        let conn = open_in_memory().unwrap();
        // "2" and "3" share the 10:00 local hour.
        let rows = [
            incident("1", "ALARM", "1 MAIN ST", 1),
            incident("2", "ALARM", "1 MAIN ST", 2),
            incident("3", "ALARM", "1 MAIN ST", 2),
        ];
        let _ = incidents::record_occurrences(&conn, &rows, now(), &tz());

        let window = TimeWindow::trailing_hours(24, now() + Duration::seconds(1));
        let report = build_report(&conn, &Classifier::default(), &window, 5).unwrap();
        assert_eq!(
            report.peak_hours,
            vec![
                HourlyStat {
                    hour: 10,
                    count: 2,
                    violent: 0
                },
                HourlyStat {
                    hour: 11,
                    count: 1,
                    violent: 0
                },
            ]
        );
    }
}
