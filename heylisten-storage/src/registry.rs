//! Registry of monitoring relationships.
//!
//! Several recipients share one backing document, so every mutation is a
//! read-modify-write of the whole list under a single lock. A mutation is
//! only committed to memory once the document has been written; a failed
//! write leaves the registry exactly as it was.

use crate::document::{read_document, write_document, Loaded};
use crate::error::StorageResult;
use heylisten_types::{PlaylistId, PlaylistInfo, RecipientId, RegistryEntry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// File name (under the data dir) of the registry document.
pub const REGISTRY_FILE_NAME: &str = "monitored_playlists.json";

/// What an [`Registry::upsert`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new entry was created.
    Inserted,
    /// An existing unowned entry for the playlist was given the recipient.
    AttachedRecipient,
    /// The relationship already existed; nothing changed.
    AlreadyPresent,
}

/// Durable list of [`RegistryEntry`] values, unique per `(id, recipient)`.
pub struct Registry {
    path: Option<PathBuf>,
    entries: Mutex<Vec<RegistryEntry>>,
}

impl Registry {
    /// Opens the registry document at `path`, creating an empty one if it
    /// does not exist. A malformed document is logged and treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = match read_document::<Vec<RegistryEntry>>(&path).await {
            Loaded::Found(entries) => dedup(entries),
            Loaded::Missing => {
                write_document(&path, &Vec::<RegistryEntry>::new()).await?;
                info!("Created new playlist registry at {}", path.display());
                Vec::new()
            }
            Loaded::Malformed => {
                error!(
                    "Playlist registry at {} is unreadable, starting empty",
                    path.display()
                );
                Vec::new()
            }
        };

        debug!("Loaded {} registry entries", entries.len());
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Creates a registry with no backing document.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Backing document path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All entries in insertion order.
    pub async fn list(&self) -> Vec<RegistryEntry> {
        self.entries.lock().await.clone()
    }

    /// Entries owned by `recipient`.
    pub async fn list_for_recipient(&self, recipient: &RecipientId) -> Vec<RegistryEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.is_owned_by(Some(recipient)))
            .cloned()
            .collect()
    }

    /// Returns the entry for exactly `(id, recipient)`.
    pub async fn get(
        &self,
        id: &PlaylistId,
        recipient: Option<&RecipientId>,
    ) -> Option<RegistryEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.matches(id, recipient))
            .cloned()
    }

    /// Distinct playlist ids, in first-seen order.
    pub async fn playlist_ids(&self) -> Vec<PlaylistId> {
        let entries = self.entries.lock().await;
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter(|e| seen.insert(e.id.clone()))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if there are no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Records that `recipient` (or nobody) monitors `info.id`.
    ///
    /// - An existing `(id, recipient)` entry is left alone.
    /// - With a recipient, an unowned entry for the same playlist is claimed;
    ///   otherwise a second, independent entry is created.
    /// - Without a recipient, any existing entry for the playlist is kept
    ///   as is, so an existing association is never dropped.
    pub async fn upsert(
        &self,
        info: PlaylistInfo,
        recipient: Option<RecipientId>,
    ) -> StorageResult<UpsertOutcome> {
        let mut entries = self.entries.lock().await;

        if entries.iter().any(|e| e.matches(&info.id, recipient.as_ref())) {
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        let mut next = entries.clone();
        let outcome = match &recipient {
            Some(_) => {
                match next
                    .iter_mut()
                    .find(|e| e.id == info.id && e.recipient.is_none())
                {
                    Some(unowned) => {
                        unowned.recipient = recipient.clone();
                        unowned.name = info.name.clone();
                        unowned.track_count = info.track_count;
                        UpsertOutcome::AttachedRecipient
                    }
                    None => {
                        next.push(RegistryEntry::new(info.clone(), recipient.clone()));
                        UpsertOutcome::Inserted
                    }
                }
            }
            None if next.iter().any(|e| e.id == info.id) => {
                return Ok(UpsertOutcome::AlreadyPresent);
            }
            None => {
                next.push(RegistryEntry::new(info.clone(), None));
                UpsertOutcome::Inserted
            }
        };

        self.commit(&mut entries, next).await?;
        debug!(
            "Registry upsert for playlist {} (recipient: {:?}): {:?}",
            info.id, recipient, outcome
        );
        Ok(outcome)
    }

    /// Removes the entry for exactly `(id, recipient)`. Returns whether an
    /// entry was removed.
    pub async fn remove(
        &self,
        id: &PlaylistId,
        recipient: Option<&RecipientId>,
    ) -> StorageResult<bool> {
        let mut entries = self.entries.lock().await;
        if !entries.iter().any(|e| e.matches(id, recipient)) {
            return Ok(false);
        }

        let next = entries
            .iter()
            .filter(|e| !e.matches(id, recipient))
            .cloned()
            .collect();
        self.commit(&mut entries, next).await?;
        Ok(true)
    }

    /// Replaces the set of playlists owned by `recipient`.
    ///
    /// The recipient's new entries are exactly the `candidates` whose id is
    /// in `ids`. Entries owned by anyone else are untouched. Ids with no
    /// matching candidate are ignored.
    pub async fn replace_set(
        &self,
        ids: &[PlaylistId],
        candidates: &[PlaylistInfo],
        recipient: Option<&RecipientId>,
    ) -> StorageResult<()> {
        let wanted: HashSet<&PlaylistId> = ids.iter().collect();
        let mut entries = self.entries.lock().await;

        let mut next: Vec<RegistryEntry> = entries
            .iter()
            .filter(|e| !e.is_owned_by(recipient))
            .cloned()
            .collect();

        let mut added = HashSet::new();
        for candidate in candidates {
            if wanted.contains(&candidate.id) && added.insert(candidate.id.clone()) {
                next.push(RegistryEntry::new(candidate.clone(), recipient.cloned()));
            }
        }

        for id in ids.iter().filter(|id| !added.contains(*id)) {
            debug!("Playlist {} is not among the candidates, ignoring", id);
        }

        self.commit(&mut entries, next).await?;
        info!(
            "Recipient {:?} now monitors {} playlist(s)",
            recipient.map(RecipientId::as_str),
            added.len()
        );
        Ok(())
    }

    /// Refreshes the cached name and item count on every entry for
    /// `info.id`. Returns how many entries changed.
    pub async fn update_metadata(&self, info: &PlaylistInfo) -> StorageResult<usize> {
        let mut entries = self.entries.lock().await;
        let stale = |e: &RegistryEntry| {
            e.id == info.id && (e.name != info.name || e.track_count != info.track_count)
        };

        let changed = entries.iter().filter(|&e| stale(e)).count();
        if changed == 0 {
            return Ok(0);
        }

        let next = entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.id == info.id {
                    e.name = info.name.clone();
                    e.track_count = info.track_count;
                }
                e
            })
            .collect();
        self.commit(&mut entries, next).await?;
        Ok(changed)
    }

    async fn commit(
        &self,
        entries: &mut Vec<RegistryEntry>,
        next: Vec<RegistryEntry>,
    ) -> StorageResult<()> {
        if let Some(path) = &self.path {
            write_document(path, &next).await?;
        }
        *entries = next;
        Ok(())
    }
}

fn dedup(entries: Vec<RegistryEntry>) -> Vec<RegistryEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert((e.id.clone(), e.recipient.clone())))
        .collect()
}
