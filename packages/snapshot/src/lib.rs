#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot state and the state differ.
//!
//! A [`Snapshot`] is the full set of incidents reported by one poll, keyed
//! by raw identifier. [`diff`] is a pure function from the previous snapshot
//! and the current poll to the next snapshot plus the incidents that
//! appeared and cleared in between. It has no notion of a "first run";
//! callers decide whether an empty previous snapshot should be announced.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use incident_watch_incident_models::Incident;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The incidents reported by one poll, keyed by raw identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Last-seen record for every identifier in the poll.
    pub incidents: BTreeMap<String, Incident>,
    /// When this snapshot was taken. `None` for the initial empty state.
    pub updated_at: Option<DateTime<Utc>>,
    /// Fingerprint of the identifier set (see [`fingerprint`]).
    pub fingerprint: Option<String>,
}

impl Snapshot {
    /// Returns `true` if this is the initial state that no poll has
    /// replaced yet.
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        self.updated_at.is_none()
    }

    /// Number of incidents in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Returns `true` if the snapshot has no incidents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// Result of diffing the previous snapshot against the current poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// Current incidents whose id was absent from the previous snapshot, in
    /// poll order.
    pub new: Vec<Incident>,
    /// Previous incidents whose id is absent from the current poll, as they
    /// were last seen.
    pub cleared: Vec<Incident>,
    /// The current poll as a snapshot; becomes the next previous.
    pub next: Snapshot,
}

impl Diff {
    /// Returns `true` if nothing appeared or cleared.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.new.is_empty() && self.cleared.is_empty()
    }

    /// Fingerprint of the current poll.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.next.fingerprint.as_deref().unwrap_or_default()
    }
}

/// Compares `current` against `previous` by identifier set.
///
/// An identifier repeated within `current` is reported as new at most once
/// (first occurrence); the next snapshot keeps its last occurrence.
#[must_use]
pub fn diff(previous: &Snapshot, current: Vec<Incident>, now: DateTime<Utc>) -> Diff {
    let current_ids: BTreeSet<&str> = current.iter().map(|i| i.id.as_str()).collect();

    let cleared: Vec<Incident> = previous
        .incidents
        .iter()
        .filter(|(id, _)| !current_ids.contains(id.as_str()))
        .map(|(_, incident)| incident.clone())
        .collect();

    let fingerprint = fingerprint(current_ids.iter().copied());

    let mut announced: BTreeSet<&str> = BTreeSet::new();
    let new: Vec<Incident> = current
        .iter()
        .filter(|i| !previous.incidents.contains_key(&i.id) && announced.insert(&i.id))
        .cloned()
        .collect();

    let incidents: BTreeMap<String, Incident> =
        current.into_iter().map(|i| (i.id.clone(), i)).collect();

    Diff {
        new,
        cleared,
        next: Snapshot {
            incidents,
            updated_at: Some(now),
            fingerprint: Some(fingerprint),
        },
    }
}

/// Returns a deterministic hex SHA-256 digest of the sorted, de-duplicated
/// identifier set.
///
/// Used to detect "nothing changed" between two polls without a full diff.
/// Only identifiers are covered: a recycled identifier with a new receipt
/// time produces the same fingerprint.
#[must_use]
pub fn fingerprint<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let sorted: BTreeSet<&str> = ids.into_iter().collect();
    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
