//! Schema creation, column migrations and derived-column backfill.
//!
//! Migration is idempotent and runs on every open. Backfill is a separate,
//! explicit step: it fills derived columns that are `NULL` (rows written
//! before the column existed) and never touches a value already present.

use chrono_tz::Tz;
use duckdb::Connection;

use crate::{DbError, derive, from_epoch, meta};

/// Current schema version recorded in `_meta`.
pub const SCHEMA_VERSION: u32 = 2;

/// Derived columns added after the initial schema, with their SQL types.
const DERIVED_COLUMNS: &[(&str, &str)] = &[
    ("street", "TEXT"),
    ("hour_bucket", "SMALLINT"),
    ("local_date", "TEXT"),
];

/// Creates missing tables and adds missing derived columns.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub fn migrate(conn: &Connection) -> Result<(), DbError> {
    create_schema(conn)?;

    let existing = incident_columns(conn)?;
    for (column, sql_type) in DERIVED_COLUMNS {
        if !existing.iter().any(|c| c == column) {
            log::info!("Adding column incidents.{column}");
            conn.execute_batch(&format!(
                "ALTER TABLE incidents ADD COLUMN {column} {sql_type}"
            ))?;
        }
    }

    meta::set_meta(conn, "schema_version", &SCHEMA_VERSION.to_string())?;

    Ok(())
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS incidents (
            incident_id TEXT NOT NULL,
            received_at BIGINT NOT NULL,
            type_code TEXT NOT NULL,
            type_name TEXT NOT NULL,
            location TEXT,
            location_description TEXT,
            city TEXT,
            first_seen_at BIGINT NOT NULL,
            last_seen_at BIGINT NOT NULL,
            cleared BOOLEAN NOT NULL DEFAULT FALSE,
            cleared_at BIGINT,
            PRIMARY KEY (incident_id, received_at)
        );

        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reports (
            period_start BIGINT NOT NULL PRIMARY KEY,
            period_end BIGINT NOT NULL,
            text TEXT NOT NULL,
            total BIGINT NOT NULL,
            violent BIGINT NOT NULL,
            cleared BIGINT NOT NULL,
            noise BIGINT NOT NULL,
            top_streets_json TEXT NOT NULL,
            peak_hours_json TEXT NOT NULL,
            created_at BIGINT NOT NULL
        );",
    )?;

    Ok(())
}

fn incident_columns(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns WHERE table_name = 'incidents'",
    )?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Computes derived columns for rows where they are `NULL`.
///
/// Returns the number of rows updated. Running it twice updates nothing the
/// second time.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn backfill_derived_columns(conn: &Connection, tz: &Tz) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(
        "SELECT incident_id, received_at, location
         FROM incidents
         WHERE (street IS NULL AND location IS NOT NULL AND trim(location) <> '')
            OR hour_bucket IS NULL
            OR local_date IS NULL",
    )?;

    let pending = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if pending.is_empty() {
        log::info!("Backfill: all derived columns already populated");
        return Ok(0);
    }

    let mut update = conn.prepare(
        "UPDATE incidents SET
            street = COALESCE(street, ?),
            hour_bucket = COALESCE(hour_bucket, ?),
            local_date = COALESCE(local_date, ?)
         WHERE incident_id = ? AND received_at = ?",
    )?;

    let mut total = 0u64;
    for (incident_id, received_at, location) in &pending {
        let at = from_epoch(*received_at)?;
        let street = derive::street(location.as_deref());
        let hour = i16::from(derive::hour_bucket(at, tz));
        let date = derive::local_date(at, tz);

        let rows = update.execute(duckdb::params![
            street.as_deref(),
            hour,
            date,
            incident_id,
            received_at,
        ])?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    log::info!("Backfill: populated derived columns on {total} rows");

    Ok(total)
}
