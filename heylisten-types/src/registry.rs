//! Registry entries: the monitoring intent of one recipient for one playlist.

use crate::{PlaylistId, PlaylistInfo, RecipientId};
use serde::{Deserialize, Serialize};

/// One unit of monitoring intent.
///
/// Entries are unique per `(id, recipient)`. An entry without a recipient is
/// a "global" watch: it is checked every cycle but nobody is notified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: PlaylistId,
    /// Cached display name, refreshed on every successful fetch.
    pub name: String,
    /// Cached item count, refreshed on every successful fetch.
    #[serde(default)]
    pub track_count: usize,
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientId>,
}

impl RegistryEntry {
    /// Creates an entry from display metadata.
    pub fn new(info: PlaylistInfo, recipient: Option<RecipientId>) -> Self {
        Self {
            id: info.id,
            name: info.name,
            track_count: info.track_count,
            recipient,
        }
    }

    /// Returns true if this entry is the `(id, recipient)` pair.
    #[must_use]
    pub fn matches(&self, id: &PlaylistId, recipient: Option<&RecipientId>) -> bool {
        &self.id == id && self.recipient.as_ref() == recipient
    }

    /// Returns true if this entry belongs to `recipient` (or is unowned when
    /// `recipient` is `None`).
    #[must_use]
    pub fn is_owned_by(&self, recipient: Option<&RecipientId>) -> bool {
        self.recipient.as_ref() == recipient
    }

    /// The cached display metadata.
    #[must_use]
    pub fn info(&self) -> PlaylistInfo {
        PlaylistInfo::new(self.id.clone(), self.name.clone(), self.track_count)
    }
}
