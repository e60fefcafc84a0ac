//! Windowed statistics queries.

use incident_watch_analytics_models::{
    DailyStat, Hotspot, HourlyStat, TimeWindow, TypeStat, ViolentHourStat, WindowSummary,
};
use incident_watch_database::duckdb::{self, Connection};
use incident_watch_incident_models::{Classifier, IncidentClass};

use crate::{
    AnalyticsError,
    filters::{SqlParams, class_predicate, where_clause, window_filter},
    to_u64,
};

/// Mean clear duration in seconds over cleared rows; `NULL` when none.
const AVG_CLEAR_SQL: &str = "AVG(CASE WHEN cleared THEN cleared_at - received_at END)";

fn hour_from(value: i16) -> u8 {
    u8::try_from(value).unwrap_or(0)
}

fn query<T>(
    conn: &Connection,
    sql: &str,
    params: &SqlParams,
    map: impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
) -> Result<Vec<T>, AnalyticsError> {
    log::trace!("analytics query: {sql}");
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(duckdb::params_from_iter(params.values().iter()), map)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Counts and average clear time per type name, top `limit` by count.
///
/// With `exclude_noise`, noise-classified types are left out of the
/// ranking.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn type_stats(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
    limit: u32,
    exclude_noise: bool,
) -> Result<Vec<TypeStat>, AnalyticsError> {
    let mut params = SqlParams::default();
    let mut frags = vec![window_filter(&mut params, window)];
    if exclude_noise {
        let noise = class_predicate(&mut params, classifier, IncidentClass::Noise);
        frags.push(format!("NOT {noise}"));
    }
    let limit = params.bind(i64::from(limit));

    let sql = format!(
        "SELECT type_name, COUNT(*) AS cnt, {AVG_CLEAR_SQL} AS avg_clear
         FROM incidents{}
         GROUP BY type_name
         ORDER BY cnt DESC, type_name
         LIMIT {limit}",
        where_clause(&frags),
    );

    query(conn, &sql, &params, |row| {
        Ok(TypeStat {
            type_name: row.get(0)?,
            count: to_u64(row.get(1)?),
            avg_clear_secs: row.get(2)?,
        })
    })
}

/// Counts per local date, most recent first.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn daily_stats(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
) -> Result<Vec<DailyStat>, AnalyticsError> {
    let mut params = SqlParams::default();
    let violent = class_predicate(&mut params, classifier, IncidentClass::Violent);
    let frags = vec![
        window_filter(&mut params, window),
        "local_date IS NOT NULL".to_string(),
    ];

    let sql = format!(
        "SELECT local_date, COUNT(*), COUNT(*) FILTER (WHERE {violent})
         FROM incidents{}
         GROUP BY local_date
         ORDER BY local_date DESC",
        where_clause(&frags),
    );

    query(conn, &sql, &params, |row| {
        Ok(DailyStat {
            date: row.get(0)?,
            count: to_u64(row.get(1)?),
            violent: to_u64(row.get(2)?),
        })
    })
}

/// Counts per local hour of day, ascending by hour.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn hourly_stats(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
) -> Result<Vec<HourlyStat>, AnalyticsError> {
    let mut params = SqlParams::default();
    let violent = class_predicate(&mut params, classifier, IncidentClass::Violent);
    let frags = vec![
        window_filter(&mut params, window),
        "hour_bucket IS NOT NULL".to_string(),
    ];

    let sql = format!(
        "SELECT hour_bucket, COUNT(*), COUNT(*) FILTER (WHERE {violent})
         FROM incidents{}
         GROUP BY hour_bucket
         ORDER BY hour_bucket",
        where_clause(&frags),
    );

    query(conn, &sql, &params, |row| {
        Ok(HourlyStat {
            hour: hour_from(row.get(0)?),
            count: to_u64(row.get(1)?),
            violent: to_u64(row.get(2)?),
        })
    })
}

/// Streets with the most violent occurrences, top `limit`.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn hotspot_streets(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
    limit: u32,
) -> Result<Vec<Hotspot>, AnalyticsError> {
    let mut params = SqlParams::default();
    let frags = vec![
        window_filter(&mut params, window),
        class_predicate(&mut params, classifier, IncidentClass::Violent),
        "street IS NOT NULL".to_string(),
    ];
    let limit = params.bind(i64::from(limit));

    let sql = format!(
        "SELECT street, city, COUNT(*) AS cnt
         FROM incidents{}
         GROUP BY street, city
         ORDER BY cnt DESC, street, city
         LIMIT {limit}",
        where_clause(&frags),
    );

    query(conn, &sql, &params, |row| {
        Ok(Hotspot {
            street: row.get(0)?,
            city: row.get(1)?,
            count: to_u64(row.get(2)?),
        })
    })
}

/// Violent occurrences per local hour and type, by hour then count.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn violent_by_hour(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
) -> Result<Vec<ViolentHourStat>, AnalyticsError> {
    let mut params = SqlParams::default();
    let frags = vec![
        window_filter(&mut params, window),
        class_predicate(&mut params, classifier, IncidentClass::Violent),
        "hour_bucket IS NOT NULL".to_string(),
    ];

    let sql = format!(
        "SELECT hour_bucket, type_name, COUNT(*) AS cnt
         FROM incidents{}
         GROUP BY hour_bucket, type_name
         ORDER BY hour_bucket, cnt DESC, type_name",
        where_clause(&frags),
    );

    query(conn, &sql, &params, |row| {
        Ok(ViolentHourStat {
            hour: hour_from(row.get(0)?),
            type_name: row.get(1)?,
            count: to_u64(row.get(2)?),
        })
    })
}

/// Headline counters for the window.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the query fails.
pub fn summary(
    conn: &Connection,
    window: &TimeWindow,
    classifier: &Classifier,
) -> Result<WindowSummary, AnalyticsError> {
    let mut params = SqlParams::default();
    let violent = class_predicate(&mut params, classifier, IncidentClass::Violent);
    let noise = class_predicate(&mut params, classifier, IncidentClass::Noise);
    let frags = vec![window_filter(&mut params, window)];

    let sql = format!(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE {violent}),
                COUNT(*) FILTER (WHERE cleared),
                COUNT(*) FILTER (WHERE {noise}),
                {AVG_CLEAR_SQL}
         FROM incidents{}",
        where_clause(&frags),
    );

    let rows = query(conn, &sql, &params, |row| {
        Ok(WindowSummary {
            total: to_u64(row.get(0)?),
            violent: to_u64(row.get(1)?),
            cleared: to_u64(row.get(2)?),
            noise: to_u64(row.get(3)?),
            avg_clear_secs: row.get(4)?,
        })
    })?;

    Ok(rows.into_iter().next().unwrap_or_default())
}
