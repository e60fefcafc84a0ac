//! Archive of generated periodic reports.

use chrono::{DateTime, Utc};
use duckdb::Connection;
use incident_watch_database_models::ReportRecord;

use crate::{DbError, from_epoch};

/// Saves a report, replacing any existing report for the same period start.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn save_report(conn: &Connection, report: &ReportRecord) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO reports (
            period_start, period_end, text, total, violent, cleared, noise,
            top_streets_json, peak_hours_json, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (period_start) DO UPDATE SET
            period_end = EXCLUDED.period_end,
            text = EXCLUDED.text,
            total = EXCLUDED.total,
            violent = EXCLUDED.violent,
            cleared = EXCLUDED.cleared,
            noise = EXCLUDED.noise,
            top_streets_json = EXCLUDED.top_streets_json,
            peak_hours_json = EXCLUDED.peak_hours_json,
            created_at = EXCLUDED.created_at",
        duckdb::params![
            report.period_start.timestamp(),
            report.period_end.timestamp(),
            report.text,
            to_i64(report.total),
            to_i64(report.violent),
            to_i64(report.cleared),
            to_i64(report.noise),
            report.top_streets_json,
            report.peak_hours_json,
            report.created_at.timestamp(),
        ],
    )?;

    log::debug!(
        "Archived report for period starting {}",
        report.period_start.to_rfc3339()
    );

    Ok(())
}

/// Returns the most recent reports, newest period first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn latest_reports(conn: &Connection, limit: u32) -> Result<Vec<ReportRecord>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT period_start, period_end, text, total, violent, cleared, noise,
                top_streets_json, peak_hours_json, created_at
         FROM reports
         ORDER BY period_start DESC
         LIMIT ?",
    )?;
    let raw = stmt
        .query_map([i64::from(limit)], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(RawReport::into_record).collect()
}

/// Returns the report for exactly `period_start`, if archived.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_report(
    conn: &Connection,
    period_start: DateTime<Utc>,
) -> Result<Option<ReportRecord>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT period_start, period_end, text, total, violent, cleared, noise,
                top_streets_json, peak_hours_json, created_at
         FROM reports
         WHERE period_start = ?",
    )?;
    match stmt.query_row([period_start.timestamp()], read_row) {
        Ok(raw) => Ok(Some(raw.into_record()?)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

struct RawReport {
    period_start: i64,
    period_end: i64,
    text: String,
    total: i64,
    violent: i64,
    cleared: i64,
    noise: i64,
    top_streets_json: String,
    peak_hours_json: String,
    created_at: i64,
}

fn read_row(row: &duckdb::Row<'_>) -> duckdb::Result<RawReport> {
    Ok(RawReport {
        period_start: row.get(0)?,
        period_end: row.get(1)?,
        text: row.get(2)?,
        total: row.get(3)?,
        violent: row.get(4)?,
        cleared: row.get(5)?,
        noise: row.get(6)?,
        top_streets_json: row.get(7)?,
        peak_hours_json: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl RawReport {
    fn into_record(self) -> Result<ReportRecord, DbError> {
        Ok(ReportRecord {
            period_start: from_epoch(self.period_start)?,
            period_end: from_epoch(self.period_end)?,
            text: self.text,
            total: to_u64(self.total),
            violent: to_u64(self.violent),
            cleared: to_u64(self.cleared),
            noise: to_u64(self.noise),
            top_streets_json: self.top_streets_json,
            peak_hours_json: self.peak_hours_json,
            created_at: from_epoch(self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;
    use crate::open_in_memory;

    fn report(start: i64, text: &str) -> ReportRecord {
        let period_start = Utc.timestamp_opt(start, 0).unwrap();
        ReportRecord {
            period_start,
            period_end: period_start + Duration::days(7),
            text: text.to_string(),
            total: 10,
            violent: 3,
            cleared: 8,
            noise: 1,
            top_streets_json: "[]".to_string(),
            peak_hours_json: "[]".to_string(),
            created_at: period_start + Duration::days(7),
        }
    }

    #[test]
    fn saving_same_period_replaces_report() {
        let conn = open_in_memory().unwrap();
        save_report(&conn, &report(1_705_000_000, "first")).unwrap();
        save_report(&conn, &report(1_705_000_000, "second")).unwrap();

        let all = latest_reports(&conn, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "second");
    }

    #[test]
    fn latest_reports_newest_first() {
        let conn = open_in_memory().unwrap();
        save_report(&conn, &report(1_700_000_000, "a")).unwrap();
        save_report(&conn, &report(1_710_000_000, "c")).unwrap();
        save_report(&conn, &report(1_705_000_000, "b")).unwrap();

        let texts: Vec<String> = latest_reports(&conn, 2)
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["c", "b"]);
    }

    #[test]
    fn get_report_by_period() {
        let conn = open_in_memory().unwrap();
        let saved = report(1_705_000_000, "x");
        save_report(&conn, &saved).unwrap();

        assert_eq!(
            get_report(&conn, saved.period_start).unwrap(),
            Some(saved.clone())
        );
        assert_eq!(
            get_report(&conn, saved.period_start + Duration::seconds(1)).unwrap(),
            None
        );
    }
}
