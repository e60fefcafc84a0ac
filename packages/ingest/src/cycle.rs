//! The poll cycle and the interval loop around it.
//!
//! [`poll_cycle`] takes the previous snapshot as a value and returns the
//! next one; [`watch`] threads it from tick to tick. A failed fetch returns
//! before anything is written, so the next tick diffs against the same
//! previous snapshot.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use incident_watch_database::{duckdb::Connection, incidents, meta};
use incident_watch_feed::IncidentFeed;
use incident_watch_incident_models::Incident;
use incident_watch_ingest_models::{CycleOutcome, CycleStatus};
use incident_watch_render::report::render_changes;
use incident_watch_snapshot::{Snapshot, diff};
use tokio::time::MissedTickBehavior;

use crate::IngestError;
use crate::publish::{PublishTarget, Publisher};

/// Per-cycle behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Zone for derived hour and date columns and rendered times.
    pub tz: Tz,
    /// Character budget of a change message.
    pub budget: usize,
    /// Announce the first poll's incidents instead of recording silently.
    pub announce_first_poll: bool,
    /// Where change messages go.
    pub target: PublishTarget,
}

/// Runs one fetch, record, diff, persist, render and publish pass.
///
/// The store is updated on every successful fetch. Rendering and publishing
/// are skipped when the identifier set matches `previous`, and on the first
/// poll unless `announce_first_poll` is set. A publisher failure is logged
/// and reported as [`CycleStatus::PublishFailed`]; the recorded state is
/// kept.
///
/// # Errors
///
/// Returns [`IngestError::Feed`] if the fetch fails, in which case nothing
/// was written, or [`IngestError::Database`] if persisting the cleared
/// occurrences or the snapshot fails.
pub async fn poll_cycle(
    conn: &Connection,
    feed: &dyn IncidentFeed,
    publisher: &dyn Publisher,
    settings: &CycleSettings,
    previous: &Snapshot,
    now: DateTime<Utc>,
) -> Result<(Snapshot, CycleOutcome), IngestError> {
    let start = Instant::now();

    let current = feed.poll().await?;
    let fetched = current.len();

    let recorded = incidents::record_occurrences(conn, &current, now, &settings.tz);
    let replaced = replaced_occurrences(previous, &current);
    let changes = diff(previous, current, now);

    let cleared_ids: Vec<&str> = changes.cleared.iter().map(|i| i.id.as_str()).collect();
    let cleared_rows = incidents::mark_cleared(conn, &cleared_ids, now)?
        + incidents::mark_cleared_occurrences(conn, &replaced, now)?;
    meta::save_snapshot(conn, &changes.next)?;

    let unchanged = changes.is_unchanged()
        || previous.fingerprint.as_deref() == Some(changes.fingerprint());

    let mut omitted = 0;
    let status = if previous.is_initial() && !settings.announce_first_poll {
        log::info!("Recorded baseline of {fetched} active incidents");
        CycleStatus::Baseline
    } else if unchanged {
        CycleStatus::Unchanged
    } else {
        let rendered = render_changes(
            &changes.new,
            &changes.cleared,
            &settings.tz,
            settings.budget,
        );
        omitted = rendered.omitted;

        match publisher.publish(&rendered.text, &settings.target).await {
            Ok(receipt) => {
                log::debug!(
                    "Published to {} (message {})",
                    publisher.label(),
                    receipt.message_id.as_deref().unwrap_or("-")
                );
                CycleStatus::Published
            }
            Err(e) => {
                log::error!("Publishing to {} failed: {e}", publisher.label());
                CycleStatus::PublishFailed
            }
        }
    };

    let outcome = CycleOutcome {
        status,
        fetched,
        new: changes.new.len(),
        cleared: changes.cleared.len(),
        cleared_rows,
        recorded,
        fingerprint: changes.fingerprint().to_string(),
        omitted,
        elapsed: start.elapsed(),
    };

    Ok((changes.next, outcome))
}

/// Previous occurrences whose id is still polled but now under a different
/// receipt time. The id was recycled upstream, so the old occurrence is gone.
fn replaced_occurrences<'a>(
    previous: &'a Snapshot,
    current: &[Incident],
) -> Vec<(&'a str, DateTime<Utc>)> {
    let current_ids: BTreeSet<&str> = current.iter().map(|i| i.id.as_str()).collect();
    let current_keys: BTreeSet<(&str, i64)> =
        current.iter().map(Incident::occurrence_key).collect();

    previous
        .incidents
        .values()
        .filter(|old| {
            current_ids.contains(old.id.as_str()) && !current_keys.contains(&old.occurrence_key())
        })
        .map(|old| (old.id.as_str(), old.received_at))
        .collect()
}

/// Logs the counts of a finished cycle.
pub fn log_outcome(outcome: &CycleOutcome) {
    log::info!(
        "Poll {}: fetched {}, new {}, cleared {}, inserted {}, updated {}, failed {} ({:.2?})",
        outcome.status,
        outcome.fetched,
        outcome.new,
        outcome.cleared,
        outcome.recorded.inserted,
        outcome.recorded.updated,
        outcome.recorded.failed,
        outcome.elapsed,
    );
    if outcome.omitted > 0 {
        log::info!("{} change lines did not fit the message", outcome.omitted);
    }
}

/// Polls every `interval` until Ctrl-C.
///
/// Starts from the persisted snapshot. Ticks that fall behind a slow cycle
/// are delayed, never bunched, and a failed cycle is logged and retried on
/// the next tick.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the persisted snapshot cannot be
/// loaded.
pub async fn watch(
    conn: &Connection,
    feed: &dyn IncidentFeed,
    publisher: &dyn Publisher,
    settings: &CycleSettings,
    interval: Duration,
) -> Result<(), IngestError> {
    let mut snapshot = meta::load_snapshot(conn)?;
    log::info!(
        "Watching {} every {interval:?} ({} incidents in last snapshot)",
        feed.label(),
        snapshot.len()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                log::info!("Interrupted, stopping");
                break;
            }
        }

        match poll_cycle(conn, feed, publisher, settings, &snapshot, Utc::now()).await {
            Ok((next, outcome)) => {
                log_outcome(&outcome);
                snapshot = next;
            }
            Err(e) => log::error!("Poll cycle failed: {e}"),
        }
    }

    Ok(())
}
