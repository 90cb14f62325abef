//! Snapshot diffing.
//!
//! Items are identified by their id. An item whose id is present on both
//! sides but whose `added_at` differs was removed and added again, and is
//! reported once, as added. Duplicate ids inside one snapshot collapse to
//! their last occurrence.

use heylisten_types::{Item, Snapshot};
use std::collections::{HashMap, HashSet};

/// Items added and removed between two snapshots of the same playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<Item>,
    pub removed: Vec<Item>,
}

impl SnapshotDiff {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes what changed from `old` to `new`.
///
/// Output order follows the order items appear in their snapshot; callers
/// should still treat both lists as sets.
#[must_use]
pub fn diff(old: &Snapshot, new: &Snapshot) -> SnapshotDiff {
    let old_items = old.items_by_id();
    let new_items = new.items_by_id();

    let added = distinct_items(new, &new_items)
        .into_iter()
        .filter(|item| match old_items.get(item.id.as_str()) {
            Some(previous) => previous.added_at != item.added_at,
            None => true,
        })
        .cloned()
        .collect();

    let removed = distinct_items(old, &old_items)
        .into_iter()
        .filter(|item| !new_items.contains_key(item.id.as_str()))
        .cloned()
        .collect();

    SnapshotDiff { added, removed }
}

/// One item per id, in first-appearance order, resolved through `by_id`.
fn distinct_items<'a>(snapshot: &'a Snapshot, by_id: &HashMap<&'a str, &'a Item>) -> Vec<&'a Item> {
    let mut seen = HashSet::new();
    snapshot
        .items
        .iter()
        .filter(|item| seen.insert(item.id.as_str()))
        .map(|item| by_id[item.id.as_str()])
        .collect()
}
