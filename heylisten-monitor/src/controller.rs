//! The monitor cycle controller.
//!
//! A cycle loads the registry, fetches every monitored playlist once, diffs
//! it against the stored snapshot, advances the snapshot, refreshes registry
//! metadata and finally hands all change-sets to the notification router.
//!
//! Every operation that touches the snapshot store runs under the cycle
//! lock, so scheduled cycles and on-demand calls never interleave.

use crate::diff::{diff, SnapshotDiff};
use crate::error::{FetchError, MonitorError, MonitorResult};
use crate::notify::NotificationRouter;
use crate::report::{CycleReport, EntityReport, EntityStatus};
use crate::source::PlaylistFetcher;
use chrono::Utc;
use heylisten_storage::{Registry, SnapshotStore, UpsertOutcome};
use heylisten_types::{
    ChangeSet, PlaylistId, PlaylistInfo, RecipientId, RegistryEntry, Snapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Market passed to every fetch.
    pub market: Option<String>,
    /// Upper bound on a single playlist fetch.
    pub fetch_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            market: Some("SE".to_string()),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

/// Result of [`MonitorController::add_playlist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPlaylist {
    pub info: PlaylistInfo,
    pub recipient: Option<RecipientId>,
    pub outcome: UpsertOutcome,
}

/// Drives monitoring cycles and the on-demand operations around them.
pub struct MonitorController {
    fetcher: Arc<dyn PlaylistFetcher>,
    registry: Arc<Registry>,
    snapshots: Arc<SnapshotStore>,
    router: NotificationRouter,
    config: MonitorConfig,
    cycle_lock: Mutex<()>,
}

impl MonitorController {
    pub fn new(
        fetcher: Arc<dyn PlaylistFetcher>,
        registry: Arc<Registry>,
        snapshots: Arc<SnapshotStore>,
        router: NotificationRouter,
        config: MonitorConfig,
    ) -> Self {
        Self {
            fetcher,
            registry,
            snapshots,
            router,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns true while a cycle or another locked operation is running.
    pub fn is_cycle_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Runs one full cycle over every registry entry.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        let cycle_id = Uuid::now_v7();
        let span = info_span!("cycle", %cycle_id);

        async {
            let started_at = Utc::now();
            let entries = self.registry.list().await;
            if entries.is_empty() {
                info!("No playlists are currently being monitored");
                return CycleReport::empty(cycle_id, started_at);
            }

            let groups = group_by_playlist(entries);
            info!("Checking {} playlists for changes...", groups.len());
            self.process(cycle_id, started_at, groups).await
        }
        .instrument(span)
        .await
    }

    /// Checks one playlist immediately, for every recipient monitoring it.
    pub async fn check_playlist(&self, id: &PlaylistId) -> MonitorResult<CycleReport> {
        let _guard = self.cycle_lock.lock().await;
        let cycle_id = Uuid::now_v7();
        let span = info_span!("check", %cycle_id, playlist = %id);

        async {
            let started_at = Utc::now();
            let entries: Vec<RegistryEntry> = self
                .registry
                .list()
                .await
                .into_iter()
                .filter(|e| &e.id == id)
                .collect();
            if entries.is_empty() {
                return Err(MonitorError::NotMonitored(id.clone()));
            }
            Ok(self
                .process(cycle_id, started_at, vec![(id.clone(), entries)])
                .await)
        }
        .instrument(span)
        .await
    }

    /// Starts monitoring `id` for `recipient`.
    ///
    /// The playlist is fetched first, so unknown playlists are rejected. If
    /// nobody monitored it before, the fetched state becomes the baseline.
    pub async fn add_playlist(
        &self,
        id: &PlaylistId,
        recipient: Option<RecipientId>,
    ) -> MonitorResult<AddedPlaylist> {
        let _guard = self.cycle_lock.lock().await;

        let snapshot = self
            .fetch(id)
            .await
            .map_err(|source| MonitorError::Fetch {
                playlist: id.clone(),
                source,
            })?;
        let info = snapshot.info();

        let watched = self.registry.list().await.iter().any(|e| &e.id == id);
        if !watched || !self.snapshots.contains(id).await {
            info!(
                "Initial load of playlist '{}' with {} tracks",
                snapshot.name,
                snapshot.item_count()
            );
            self.snapshots.put(snapshot).await?;
        }

        let outcome = self.registry.upsert(info.clone(), recipient.clone()).await?;
        if outcome == UpsertOutcome::AlreadyPresent {
            self.registry.update_metadata(&info).await?;
        }
        info!(
            "Added playlist '{}' ({}) for user {}",
            info.name,
            info.id,
            recipient.as_ref().map_or("none", RecipientId::as_str)
        );

        Ok(AddedPlaylist {
            info,
            recipient,
            outcome,
        })
    }

    /// Stops monitoring `id` for exactly `recipient`.
    pub async fn remove_playlist(
        &self,
        id: &PlaylistId,
        recipient: Option<&RecipientId>,
    ) -> MonitorResult<()> {
        let _guard = self.cycle_lock.lock().await;
        if !self.registry.remove(id, recipient).await? {
            return Err(MonitorError::NotMonitored(id.clone()));
        }
        info!(
            "Removed playlist {} for user {}",
            id,
            recipient.map_or("none", RecipientId::as_str)
        );
        Ok(())
    }

    /// Replaces the playlists `recipient` monitors with the `candidates`
    /// named in `ids`. Returns the recipient's entries afterwards.
    pub async fn replace_playlists(
        &self,
        recipient: &RecipientId,
        ids: &[PlaylistId],
        candidates: &[PlaylistInfo],
    ) -> MonitorResult<Vec<RegistryEntry>> {
        let _guard = self.cycle_lock.lock().await;
        self.registry
            .replace_set(ids, candidates, Some(recipient))
            .await?;
        Ok(self.registry.list_for_recipient(recipient).await)
    }

    /// Lists registry entries, optionally only those owned by `recipient`.
    pub async fn playlists(&self, recipient: Option<&RecipientId>) -> Vec<RegistryEntry> {
        match recipient {
            Some(recipient) => self.registry.list_for_recipient(recipient).await,
            None => self.registry.list().await,
        }
    }

    async fn process(
        &self,
        cycle_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        groups: Vec<(PlaylistId, Vec<RegistryEntry>)>,
    ) -> CycleReport {
        let mut entities = Vec::new();
        let mut pending = Vec::new();

        for (id, entries) in groups {
            let (reports, change_sets) = self.process_playlist(&id, &entries).await;
            entities.extend(reports);
            pending.extend(change_sets);
        }

        let delivery = self.router.route(pending).await;
        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            entities,
            delivery,
        };
        info!(
            "Cycle finished: {} checked, {} changed, {} failed",
            report.checked(),
            report.changed(),
            report.failed()
        );
        report
    }

    /// Fetches, diffs and persists one playlist, producing one report and at
    /// most one change-set per entry.
    async fn process_playlist(
        &self,
        id: &PlaylistId,
        entries: &[RegistryEntry],
    ) -> (Vec<EntityReport>, Vec<ChangeSet>) {
        let snapshot = match self.fetch(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping playlist {} this cycle: {}", id, e);
                let reports = entries
                    .iter()
                    .map(|entry| EntityReport {
                        playlist_id: id.clone(),
                        recipient: entry.recipient.clone(),
                        result: Err(MonitorError::Fetch {
                            playlist: id.clone(),
                            source: e.clone(),
                        }),
                    })
                    .collect();
                return (reports, Vec::new());
            }
        };

        let previous = self.snapshots.get(id).await;
        let info = snapshot.info();
        let name = snapshot.name.clone();
        let item_count = snapshot.item_count();

        let version_changed = previous
            .as_ref()
            .is_some_and(|old| old.version != snapshot.version);
        if version_changed {
            info!(
                "Detected changes in playlist '{}' (ID: {}){}",
                name,
                id,
                monitored_by(entries)
            );
        }
        let changes = previous.as_ref().map(|old| diff(old, &snapshot));

        if let Err(e) = self.snapshots.put(snapshot).await {
            warn!("Failed to persist snapshot of playlist {}: {}", id, e);
        }
        if let Err(e) = self.registry.update_metadata(&info).await {
            warn!("Failed to update registry metadata for playlist {}: {}", id, e);
        }

        let status = match &changes {
            None => {
                info!("Initial load of playlist '{}' with {} tracks", name, item_count);
                EntityStatus::Baseline { items: item_count }
            }
            Some(changes) if changes.is_empty() && version_changed => {
                info!("No tracks added or removed in playlist '{}'", name);
                EntityStatus::Revised
            }
            Some(changes) if changes.is_empty() => {
                debug!("No changes in playlist '{}'", name);
                EntityStatus::Unchanged
            }
            Some(changes) => {
                if !version_changed {
                    info!("Detected changes in playlist '{}' (ID: {})", name, id);
                }
                log_changes(changes);
                EntityStatus::Changed {
                    added: changes.added.len(),
                    removed: changes.removed.len(),
                }
            }
        };

        let change_sets = match changes {
            Some(changes) if !changes.is_empty() => entries
                .iter()
                .map(|entry| {
                    ChangeSet::new(
                        id.clone(),
                        name.clone(),
                        entry.recipient.clone(),
                        changes.added.clone(),
                        changes.removed.clone(),
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        let reports = entries
            .iter()
            .map(|entry| EntityReport {
                playlist_id: id.clone(),
                recipient: entry.recipient.clone(),
                result: Ok(status.clone()),
            })
            .collect();
        (reports, change_sets)
    }

    /// Fetches on its own task so a panicking fetcher fails only this
    /// playlist, and a timed-out fetch is cancelled.
    async fn fetch(&self, id: &PlaylistId) -> Result<Snapshot, FetchError> {
        let timeout = self.config.fetch_timeout;
        let fetcher = Arc::clone(&self.fetcher);
        let playlist = id.clone();
        let market = self.config.market.clone();
        let mut task = tokio::spawn(async move {
            fetcher.fetch_playlist(&playlist, market.as_deref()).await
        });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Fetch task for playlist {} aborted: {}", id, e);
                Err(FetchError::Aborted(e.to_string()))
            }
            Err(_) => {
                task.abort();
                Err(FetchError::Timeout(timeout))
            }
        }
    }
}

/// Groups entries by playlist, keeping first-appearance order.
fn group_by_playlist(entries: Vec<RegistryEntry>) -> Vec<(PlaylistId, Vec<RegistryEntry>)> {
    let mut groups: Vec<(PlaylistId, Vec<RegistryEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(id, _)| id == &entry.id) {
            Some((_, group)) => group.push(entry),
            None => groups.push((entry.id.clone(), vec![entry])),
        }
    }
    groups
}

/// Log suffix naming the recipients of `entries`, empty when none has one.
fn monitored_by(entries: &[RegistryEntry]) -> String {
    let recipients: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.recipient.as_ref().map(RecipientId::as_str))
        .collect();
    if recipients.is_empty() {
        String::new()
    } else {
        format!(" (monitored by user: {})", recipients.join(", "))
    }
}

fn log_changes(changes: &SnapshotDiff) {
    for item in &changes.added {
        info!(
            "Added: {} by {} (added by: {})",
            item.name,
            item.artist_line(),
            item.added_by_display()
        );
    }
    for item in &changes.removed {
        info!("Removed: {} by {}", item.name, item.artist_line());
    }
    info!(
        "Summary: {} track(s) added, {} track(s) removed",
        changes.added.len(),
        changes.removed.len()
    );
}
