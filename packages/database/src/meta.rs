//! Key/value state in the `_meta` table, including the last poll snapshot.

use duckdb::Connection;
use incident_watch_snapshot::Snapshot;

use crate::DbError;

/// `_meta` key holding the JSON-serialized last poll snapshot.
const SNAPSHOT_KEY: &str = "snapshot";

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

/// Loads the last persisted snapshot, or the initial empty snapshot if no
/// poll has completed yet.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored JSON is corrupt.
pub fn load_snapshot(conn: &Connection) -> Result<Snapshot, DbError> {
    get_meta(conn, SNAPSHOT_KEY)?.map_or_else(
        || Ok(Snapshot::default()),
        |json| Ok(serde_json::from_str(&json)?),
    )
}

/// Replaces the persisted snapshot wholesale.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or the upsert fails.
pub fn save_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<(), DbError> {
    let json = serde_json::to_string(snapshot)?;
    set_meta(conn, SNAPSHOT_KEY, &json)?;
    set_meta(
        conn,
        "last_polled_at",
        &snapshot
            .updated_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default(),
    )
}
