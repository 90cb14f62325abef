//! Per-cycle outcome reporting.

use crate::error::MonitorError;
use crate::notify::DeliveryReport;
use chrono::{DateTime, Utc};
use heylisten_types::{PlaylistId, RecipientId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one registry entry during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityStatus {
    /// First observation; a baseline snapshot was recorded.
    Baseline { items: usize },
    /// Nothing changed since the last snapshot.
    Unchanged,
    /// The version marker moved but no items were added or removed, as
    /// after a reorder or a rename.
    Revised,
    /// Items were added or removed.
    Changed { added: usize, removed: usize },
}

/// Outcome for one registry entry.
#[derive(Debug)]
pub struct EntityReport {
    pub playlist_id: PlaylistId,
    pub recipient: Option<RecipientId>,
    pub result: Result<EntityStatus, MonitorError>,
}

impl EntityReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_changed(&self) -> bool {
        matches!(self.result, Ok(EntityStatus::Changed { .. }))
    }
}

/// Everything one cycle did.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entities: Vec<EntityReport>,
    pub delivery: DeliveryReport,
}

impl CycleReport {
    pub(crate) fn empty(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            entities: Vec::new(),
            delivery: DeliveryReport::default(),
        }
    }

    /// Number of entries processed.
    pub fn checked(&self) -> usize {
        self.entities.len()
    }

    /// Number of entries whose playlist changed.
    pub fn changed(&self) -> usize {
        self.entities.iter().filter(|e| e.is_changed()).count()
    }

    /// Number of entries skipped because of an error.
    pub fn failed(&self) -> usize {
        self.entities.iter().filter(|e| !e.is_ok()).count()
    }

    /// Returns the report for `playlist_id` and `recipient`, if any.
    pub fn entity(
        &self,
        playlist_id: &PlaylistId,
        recipient: Option<&RecipientId>,
    ) -> Option<&EntityReport> {
        self.entities
            .iter()
            .find(|e| &e.playlist_id == playlist_id && e.recipient.as_ref() == recipient)
    }

    /// Serializable summary.
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            cycle_id: self.cycle_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            checked: self.checked(),
            changed: self.changed(),
            failed: self.failed(),
            errors: self
                .entities
                .iter()
                .filter_map(|e| match &e.result {
                    Err(err) => Some(EntityError {
                        playlist_id: e.playlist_id.clone(),
                        recipient: e.recipient.clone(),
                        error: err.to_string(),
                    }),
                    Ok(_) => None,
                })
                .collect(),
            delivery: self.delivery.clone(),
        }
    }
}

/// Error recorded for one entry in a [`CycleSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityError {
    pub playlist_id: PlaylistId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientId>,
    pub error: String,
}

/// Serializable view of a [`CycleReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub changed: usize,
    pub failed: usize,
    pub errors: Vec<EntityError>,
    pub delivery: DeliveryReport,
}
