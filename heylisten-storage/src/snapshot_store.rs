//! Last-observed snapshot per playlist.
//!
//! The store keeps every snapshot it has seen in memory and mirrors it to
//! `<dir>/playlist_<id>.json`. Memory is updated before the file is written:
//! if the write fails the caller still reads the newer snapshot back, and the
//! next successful `put` brings the file up to date.

use crate::document::{read_document, write_document, Loaded};
use crate::error::StorageResult;
use heylisten_types::{PlaylistId, Snapshot};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Directory (under the data dir) holding snapshot documents.
pub const SNAPSHOT_DIR_NAME: &str = "cache";

/// Durable mapping from playlist id to its most recent snapshot.
pub struct SnapshotStore {
    dir: Option<PathBuf>,
    snapshots: RwLock<HashMap<PlaylistId, Snapshot>>,
}

impl SnapshotStore {
    /// Opens (or creates) a snapshot directory.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            info!("Created snapshot directory {}", dir.display());
        }
        Ok(Self {
            dir: Some(dir),
            snapshots: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a store with no backing directory.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Backing directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Path of the document for `id`, if the store is file-backed.
    pub fn path_for(&self, id: &PlaylistId) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("playlist_{id}.json")))
    }

    /// Returns the last snapshot for `id`.
    ///
    /// Never fails. A missing, unreadable or malformed document is reported
    /// as absent, which callers treat exactly like a playlist never seen.
    pub async fn get(&self, id: &PlaylistId) -> Option<Snapshot> {
        if let Some(snapshot) = self.snapshots.read().await.get(id) {
            return Some(snapshot.clone());
        }

        let path = self.path_for(id)?;
        let snapshot = match read_document::<Snapshot>(&path).await {
            Loaded::Found(snapshot) if &snapshot.id == id => snapshot,
            Loaded::Found(snapshot) => {
                warn!(
                    "Snapshot document {} belongs to playlist {}, ignoring",
                    path.display(),
                    snapshot.id
                );
                return None;
            }
            other => return other.into_option(),
        };

        debug!("Loaded cached data for playlist {}", id);
        // A concurrent put may have landed while we were reading; keep it.
        let mut snapshots = self.snapshots.write().await;
        Some(snapshots.entry(id.clone()).or_insert(snapshot).clone())
    }

    /// Returns true if a snapshot for `id` is available.
    pub async fn contains(&self, id: &PlaylistId) -> bool {
        self.get(id).await.is_some()
    }

    /// Stores `snapshot`, replacing any previous snapshot for the same id.
    ///
    /// The in-memory view is updated even when writing the document fails.
    pub async fn put(&self, snapshot: Snapshot) -> StorageResult<()> {
        let path = self.path_for(&snapshot.id);
        let id = snapshot.id.clone();
        let item_count = snapshot.item_count();

        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(id.clone(), snapshot);

        if let Some(path) = path {
            // Holding the lock keeps concurrent writers for the same file ordered.
            let current = &snapshots[&id];
            write_document(&path, current).await?;
            debug!(
                "Saved snapshot of playlist {} ({} items) to {}",
                id,
                item_count,
                path.display()
            );
        }
        Ok(())
    }

    /// Warms the in-memory view for `ids`. Returns how many snapshots were
    /// found.
    pub async fn preload<'a>(&self, ids: impl IntoIterator<Item = &'a PlaylistId>) -> usize {
        let mut found = 0;
        for id in ids {
            if self.get(id).await.is_some() {
                found += 1;
            }
        }
        found
    }

    /// Number of snapshots currently held in memory.
    pub async fn cached_len(&self) -> usize {
        self.snapshots.read().await.len()
    }
}
