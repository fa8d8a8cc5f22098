//! Event snapshots supplied by the caller
//!
//! The engine never fetches data itself. A snapshot is everything it gets to
//! see for one analysis pass. Records that fail validation are dropped from
//! the pass and counted, so one bad check-in never sinks the whole batch.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::models::{BaselineProfile, BoundaryEvent, InteractionEvent, TriggerObservation};

/// An ordered collection of logged events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(default)]
    pub interactions: Vec<InteractionEvent>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryEvent>,
    #[serde(default)]
    pub triggers: Vec<TriggerObservation>,
    /// Records dropped while decoding, before validation ever saw them
    #[serde(skip)]
    pub rejected: SkippedRecords,
}

/// How many records of each kind were rejected during validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecords {
    pub interactions: usize,
    pub boundaries: usize,
    pub triggers: usize,
}

impl SkippedRecords {
    pub fn total(&self) -> usize {
        self.interactions + self.boundaries + self.triggers
    }
}

impl EventSnapshot {
    /// Drop invalid records and sort each collection chronologically
    ///
    /// The sort is stable, so events sharing a timestamp keep the caller's order.
    /// Records rejected while decoding are included in the returned counts.
    pub fn sanitized(&self) -> (EventSnapshot, SkippedRecords) {
        let mut skipped = self.rejected;

        let mut interactions: Vec<InteractionEvent> = self
            .interactions
            .iter()
            .filter(|event| match event.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Skipping interaction");
                    skipped.interactions += 1;
                    false
                }
            })
            .cloned()
            .collect();

        let mut boundaries: Vec<BoundaryEvent> = self
            .boundaries
            .iter()
            .filter(|event| match event.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Skipping boundary event");
                    skipped.boundaries += 1;
                    false
                }
            })
            .cloned()
            .collect();

        let mut triggers: Vec<TriggerObservation> = self
            .triggers
            .iter()
            .filter(|obs| match obs.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Skipping trigger observation");
                    skipped.triggers += 1;
                    false
                }
            })
            .cloned()
            .collect();

        interactions.sort_by_key(|e| e.timestamp);
        boundaries.sort_by_key(|e| e.timestamp);
        triggers.sort_by_key(|o| o.timestamp);

        (
            EventSnapshot {
                interactions,
                boundaries,
                triggers,
                rejected: SkippedRecords::default(),
            },
            skipped,
        )
    }

    /// Distinct relationship references, sorted
    pub fn relationship_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .interactions
            .iter()
            .map(|e| e.relationship_id.as_str())
            .chain(self.boundaries.iter().map(|e| e.relationship_id.as_str()))
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Events for a single relationship
    ///
    /// Trigger observations are not tied to a relationship and are kept whole.
    /// Undecodable records have no known relationship and are not carried over.
    pub fn for_relationship(&self, relationship_id: &str) -> EventSnapshot {
        EventSnapshot {
            interactions: self
                .interactions
                .iter()
                .filter(|e| e.relationship_id == relationship_id)
                .cloned()
                .collect(),
            boundaries: self
                .boundaries
                .iter()
                .filter(|e| e.relationship_id == relationship_id)
                .cloned()
                .collect(),
            triggers: self.triggers.clone(),
            rejected: SkippedRecords::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty() && self.boundaries.is_empty() && self.triggers.is_empty()
    }
}

/// On-disk snapshot: events plus the optional baseline profile
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotFile {
    #[serde(flatten)]
    pub events: EventSnapshot,
    pub baseline: Option<BaselineProfile>,
}

/// Snapshot as read from disk, records still undecoded
#[derive(Deserialize)]
struct RawSnapshotFile {
    #[serde(default)]
    interactions: Vec<Value>,
    #[serde(default)]
    boundaries: Vec<Value>,
    #[serde(default)]
    triggers: Vec<Value>,
    #[serde(default)]
    baseline: Option<BaselineProfile>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a snapshot document
    ///
    /// Each record is decoded on its own. A record with an out-of-range
    /// number or an unknown enum value is skipped and counted in
    /// `events.rejected`. Only a malformed document fails as a whole.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawSnapshotFile = serde_json::from_str(content)?;
        let mut rejected = SkippedRecords::default();

        let interactions =
            decode_records(raw.interactions, "interaction", &mut rejected.interactions);
        let boundaries = decode_records(raw.boundaries, "boundary", &mut rejected.boundaries);
        let triggers = decode_records(raw.triggers, "trigger", &mut rejected.triggers);

        Ok(Self {
            events: EventSnapshot {
                interactions,
                boundaries,
                triggers,
                rejected,
            },
            baseline: raw.baseline,
        })
    }
}

fn decode_records<T: DeserializeOwned>(
    values: Vec<Value>,
    kind: &str,
    rejected: &mut usize,
) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping undecodable record");
                *rejected += 1;
                None
            }
        })
        .collect()
}
