//! Change-sets: what changed in one playlist, for one recipient, in one cycle.

use crate::{Item, PlaylistId, RecipientId};
use serde::{Deserialize, Serialize};

/// Items added to and removed from a playlist since the last observation.
///
/// Change-sets are transient. They are built by the controller and consumed
/// by the notification router in the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub playlist_id: PlaylistId,
    pub playlist_name: String,
    pub recipient: Option<RecipientId>,
    pub added: Vec<Item>,
    pub removed: Vec<Item>,
}

impl ChangeSet {
    /// Creates a change-set.
    pub fn new(
        playlist_id: PlaylistId,
        playlist_name: impl Into<String>,
        recipient: Option<RecipientId>,
        added: Vec<Item>,
        removed: Vec<Item>,
    ) -> Self {
        Self {
            playlist_id,
            playlist_name: playlist_name.into(),
            recipient,
            added,
            removed,
        }
    }

    /// Returns true if nothing was added or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// One-line summary, e.g. `"2 track(s) added, 1 track(s) removed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} track(s) added, {} track(s) removed",
            self.added.len(),
            self.removed.len()
        )
    }
}
