//! Playlist snapshots and their items.

use crate::PlaylistId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Item id used for tracks that are deleted or unavailable upstream.
pub const UNKNOWN_ITEM_ID: &str = "unknown";
/// Display name used for unavailable tracks.
pub const UNKNOWN_ITEM_NAME: &str = "Unknown Track";
/// Contributor name used for unavailable tracks.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A single member of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id. Unavailable tracks all share [`UNKNOWN_ITEM_ID`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contributor names, in the order the service lists them.
    pub artists: Vec<String>,
    /// When the item was added (ISO-8601, compared verbatim).
    pub added_at: String,
    /// Who added the item, if the service knows.
    #[serde(default)]
    pub added_by: Option<String>,
}

impl Item {
    /// Creates an item with no artists and no added metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: Vec::new(),
            added_at: String::new(),
            added_by: None,
        }
    }

    /// Creates the placeholder item for a track the service no longer serves.
    pub fn unavailable(added_at: impl Into<String>, added_by: Option<String>) -> Self {
        Self {
            id: UNKNOWN_ITEM_ID.to_string(),
            name: UNKNOWN_ITEM_NAME.to_string(),
            artists: vec![UNKNOWN_ARTIST.to_string()],
            added_at: added_at.into(),
            added_by,
        }
    }

    /// Sets the contributor names.
    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists = artists.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the added-at timestamp and the adder.
    #[must_use]
    pub fn added(mut self, at: impl Into<String>, by: Option<&str>) -> Self {
        self.added_at = at.into();
        self.added_by = by.map(str::to_string);
        self
    }

    /// Artists joined for display, e.g. `"A, B"`.
    #[must_use]
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Adder for display; `"unknown"` when absent.
    #[must_use]
    pub fn added_by_display(&self) -> &str {
        self.added_by.as_deref().unwrap_or("unknown")
    }
}

/// Full observed state of one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: PlaylistId,
    pub name: String,
    /// Opaque marker that changes whenever the playlist content changes.
    #[serde(rename = "snapshot_id")]
    pub version: String,
    #[serde(rename = "tracks", default)]
    pub items: Vec<Item>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new(id: PlaylistId, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            items: Vec::new(),
        }
    }

    /// Replaces the item list.
    #[must_use]
    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    /// Number of items as listed by the service (duplicates included).
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items keyed by id. When an id occurs more than once the last
    /// occurrence wins.
    #[must_use]
    pub fn items_by_id(&self) -> HashMap<&str, &Item> {
        self.items.iter().map(|item| (item.id.as_str(), item)).collect()
    }

    /// Display metadata for the registry.
    #[must_use]
    pub fn info(&self) -> PlaylistInfo {
        PlaylistInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            track_count: self.item_count(),
        }
    }
}

/// Display metadata for a playlist: what a user picks from and what the
/// registry caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default)]
    pub track_count: usize,
}

impl PlaylistInfo {
    pub fn new(id: PlaylistId, name: impl Into<String>, track_count: usize) -> Self {
        Self {
            id,
            name: name.into(),
            track_count,
        }
    }
}
