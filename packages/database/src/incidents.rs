//! Occurrence recording, clearing and retrieval.
//!
//! Every distinct `(incident_id, received_at)` pair gets exactly one row.
//! Re-recording an occurrence only advances `last_seen_at`, and only while
//! the row is still active: once cleared, a row is frozen.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use duckdb::Connection;
use incident_watch_database_models::{RecordOutcome, RecordSummary, StoredIncident};
use incident_watch_incident_models::Incident;

use crate::{DbError, derive, from_epoch};

/// Column list shared by every `SELECT` that maps to [`StoredIncident`].
const SELECT_COLUMNS: &str = "incident_id, received_at, type_code, type_name, location,
    location_description, city, first_seen_at, last_seen_at, cleared, cleared_at,
    street, hour_bucket, local_date";

/// Records one observation of `incident` at `now`.
///
/// Derives the grouping columns, inserts the occurrence if its key is new
/// (insert-or-ignore), then advances `last_seen_at` unless the row is
/// cleared. A cleared occurrence reappearing in the feed is therefore not
/// resurrected.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn record_occurrence(
    conn: &Connection,
    incident: &Incident,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<RecordOutcome, DbError> {
    let (incident_id, received_at) = incident.occurrence_key();
    let now_secs = now.timestamp();

    let existing: Option<bool> = optional(conn.query_row(
        "SELECT cleared FROM incidents WHERE incident_id = ? AND received_at = ?",
        duckdb::params![incident_id, received_at],
        |row| row.get(0),
    ))?;

    match existing {
        None => {
            let street = derive::street(incident.location.as_deref());
            let hour = i16::from(derive::hour_bucket(incident.received_at, tz));
            let date = derive::local_date(incident.received_at, tz);

            conn.execute(
                "INSERT INTO incidents (
                    incident_id, received_at, type_code, type_name, location,
                    location_description, city, first_seen_at, last_seen_at,
                    cleared, cleared_at, street, hour_bucket, local_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, NULL, ?, ?, ?)
                ON CONFLICT (incident_id, received_at) DO NOTHING",
                duckdb::params![
                    incident_id,
                    received_at,
                    incident.type_code,
                    incident.type_name,
                    incident.location.as_deref(),
                    incident.location_description.as_deref(),
                    incident.city.as_deref(),
                    now_secs,
                    now_secs,
                    street.as_deref(),
                    hour,
                    date,
                ],
            )?;
            Ok(RecordOutcome::Inserted)
        }
        Some(true) => Ok(RecordOutcome::Frozen),
        Some(false) => {
            conn.execute(
                "UPDATE incidents SET last_seen_at = greatest(last_seen_at, ?)
                 WHERE incident_id = ? AND received_at = ? AND NOT cleared",
                duckdb::params![now_secs, incident_id, received_at],
            )?;
            Ok(RecordOutcome::Updated)
        }
    }
}

/// Records every incident of one poll.
///
/// Failures are isolated per record: a record that fails to write is logged
/// and counted, and the rest of the poll is still persisted.
#[must_use]
pub fn record_occurrences(
    conn: &Connection,
    incidents: &[Incident],
    now: DateTime<Utc>,
    tz: &Tz,
) -> RecordSummary {
    let mut summary = RecordSummary::default();

    for incident in incidents {
        match record_occurrence(conn, incident, now, tz) {
            Ok(outcome) => summary.add(outcome),
            Err(e) => {
                log::warn!(
                    "Failed to record incident {} ({}): {e}",
                    incident.id,
                    incident.received_at,
                );
                summary.failed += 1;
            }
        }
    }

    log::debug!(
        "Recorded {} incidents: {} inserted, {} updated, {} frozen, {} failed",
        incidents.len(),
        summary.inserted,
        summary.updated,
        summary.frozen,
        summary.failed,
    );

    summary
}

/// Marks the still-active occurrences of each id as cleared at `now`.
///
/// Already-cleared rows are left untouched. Returns the number of rows
/// cleared.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn mark_cleared<S: AsRef<str>>(
    conn: &Connection,
    ids: &[S],
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "UPDATE incidents SET cleared = TRUE, cleared_at = greatest(?, last_seen_at)
         WHERE incident_id = ? AND NOT cleared",
    )?;

    let mut total = 0u64;
    for id in ids {
        let rows = stmt.execute(duckdb::params![now.timestamp(), id.as_ref()])?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total)
}

/// Marks specific occurrences cleared at `now`, keyed by
/// `(incident_id, received_at)`.
///
/// Used when an identifier stays in the feed but now refers to a different
/// occurrence; the replaced one has disappeared even though its id has not.
/// Already-cleared occurrences are left untouched.
///
/// # Errors
///
/// Returns [`DbError`] if an update fails.
pub fn mark_cleared_occurrences<S: AsRef<str>>(
    conn: &Connection,
    occurrences: &[(S, DateTime<Utc>)],
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    if occurrences.is_empty() {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "UPDATE incidents SET cleared = TRUE, cleared_at = greatest(?, last_seen_at)
         WHERE incident_id = ? AND received_at = ? AND NOT cleared",
    )?;

    let mut total = 0u64;
    for (id, received_at) in occurrences {
        let rows = stmt.execute(duckdb::params![
            now.timestamp(),
            id.as_ref(),
            received_at.timestamp()
        ])?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total)
}

/// Returns every active occurrence, most recently received first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn query_active(conn: &Connection) -> Result<Vec<StoredIncident>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM incidents
         WHERE NOT cleared
         ORDER BY received_at DESC, incident_id"
    );
    query_incidents(conn, &sql, &[])
}

/// Returns occurrences received within the trailing `window_hours`, most
/// recent first, capped at `limit`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn query_recent(
    conn: &Connection,
    window_hours: u32,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<Vec<StoredIncident>, DbError> {
    let since = (now - Duration::hours(i64::from(window_hours))).timestamp();
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM incidents
         WHERE received_at >= ?
         ORDER BY received_at DESC, incident_id
         LIMIT ?"
    );
    query_incidents(conn, &sql, &[since, i64::from(limit)])
}

/// Looks up a single occurrence by its key.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_occurrence(
    conn: &Connection,
    incident_id: &str,
    received_at: DateTime<Utc>,
) -> Result<Option<StoredIncident>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM incidents WHERE incident_id = ? AND received_at = ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = optional(stmt.query_row(
        duckdb::params![incident_id, received_at.timestamp()],
        read_row,
    ))?;
    raw.map(RawRow::into_stored).transpose()
}

/// Lifetime number of distinct occurrences.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn total_count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Number of occurrences not yet cleared.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn active_count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM incidents WHERE NOT cleared",
        [],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or(0))
}

fn optional<T>(result: duckdb::Result<T>) -> Result<Option<T>, DbError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

fn query_incidents(
    conn: &Connection,
    sql: &str,
    params: &[i64],
) -> Result<Vec<StoredIncident>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(duckdb::params_from_iter(params.iter()), read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(RawRow::into_stored).collect()
}

/// A row as read from `DuckDB`, before timestamp conversion.
struct RawRow {
    incident_id: String,
    received_at: i64,
    type_code: String,
    type_name: String,
    location: Option<String>,
    location_description: Option<String>,
    city: Option<String>,
    first_seen_at: i64,
    last_seen_at: i64,
    cleared: bool,
    cleared_at: Option<i64>,
    street: Option<String>,
    hour_bucket: Option<i16>,
    local_date: Option<String>,
}

fn read_row(row: &duckdb::Row<'_>) -> duckdb::Result<RawRow> {
    Ok(RawRow {
        incident_id: row.get(0)?,
        received_at: row.get(1)?,
        type_code: row.get(2)?,
        type_name: row.get(3)?,
        location: row.get(4)?,
        location_description: row.get(5)?,
        city: row.get(6)?,
        first_seen_at: row.get(7)?,
        last_seen_at: row.get(8)?,
        cleared: row.get(9)?,
        cleared_at: row.get(10)?,
        street: row.get(11)?,
        hour_bucket: row.get(12)?,
        local_date: row.get(13)?,
    })
}

impl RawRow {
    fn into_stored(self) -> Result<StoredIncident, DbError> {
        Ok(StoredIncident {
            incident_id: self.incident_id,
            received_at: from_epoch(self.received_at)?,
            type_code: self.type_code,
            type_name: self.type_name,
            location: self.location,
            location_description: self.location_description,
            city: self.city,
            first_seen_at: from_epoch(self.first_seen_at)?,
            last_seen_at: from_epoch(self.last_seen_at)?,
            cleared: self.cleared,
            cleared_at: self.cleared_at.map(from_epoch).transpose()?,
            street: self.street,
            hour_bucket: self.hour_bucket.and_then(|h| u8::try_from(h).ok()),
            local_date: self.local_date,
        })
    }
}
