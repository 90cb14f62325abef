//! Shared test helpers for monitor tests.

#![allow(dead_code)]

use async_trait::async_trait;
use heylisten_monitor::{
    Deliverer, FetchError, FetchResult, MonitorConfig, MonitorController, NotificationRouter,
    PlaylistFetcher,
};
use heylisten_storage::{Registry, SnapshotStore};
use heylisten_types::{ChangeSet, Item, PlaylistId, PlaylistInfo, RecipientId, Snapshot};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn pid(s: &str) -> PlaylistId {
    PlaylistId::parse(s).unwrap()
}

pub fn rid(s: &str) -> RecipientId {
    RecipientId::parse(s).unwrap()
}

pub fn track(id: &str, added_at: &str, added_by: &str) -> Item {
    Item::new(id, format!("Track {id}"))
        .with_artists([format!("Artist {id}")])
        .added(added_at, Some(added_by))
}

pub fn snapshot(id: &str, version: &str, items: Vec<Item>) -> Snapshot {
    Snapshot::new(pid(id), format!("Playlist {id}"), version).with_items(items)
}

pub fn info(id: &str) -> PlaylistInfo {
    PlaylistInfo::new(pid(id), format!("Playlist {id}"), 0)
}

// ── Fetcher ─────────────────────────────────────────────────────

/// Serves whatever snapshot (or error) was last set for each playlist.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<PlaylistId, FetchResult<Snapshot>>>,
    calls: Mutex<Vec<(PlaylistId, Option<String>)>>,
    delay: Mutex<Option<Duration>>,
    panicking: Mutex<HashSet<PlaylistId>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, snapshot: Snapshot) {
        self.responses
            .lock()
            .unwrap()
            .insert(snapshot.id.clone(), Ok(snapshot));
    }

    pub fn fail(&self, id: &str, error: FetchError) {
        self.responses.lock().unwrap().insert(pid(id), Err(error));
    }

    pub fn panic_for(&self, id: &str) {
        self.panicking.lock().unwrap().insert(pid(id));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<(PlaylistId, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.as_str() == id)
            .count()
    }
}

#[async_trait]
impl PlaylistFetcher for FakeFetcher {
    fn provider_name(&self) -> &'static str {
        "Fake"
    }

    async fn fetch_playlist(&self, id: &PlaylistId, market: Option<&str>) -> FetchResult<Snapshot> {
        self.calls
            .lock()
            .unwrap()
            .push((id.clone(), market.map(str::to_string)));
        if self.panicking.lock().unwrap().contains(id) {
            panic!("fetcher exploded for {id}");
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(id.to_string())))
    }
}

// ── Deliverer ───────────────────────────────────────────────────

/// Records deliveries; fails or panics for configured recipients.
#[derive(Default)]
pub struct RecordingDeliverer {
    delivered: Mutex<Vec<(RecipientId, ChangeSet)>>,
    failing: Mutex<HashSet<RecipientId>>,
    panicking: Mutex<HashSet<RecipientId>>,
}

impl RecordingDeliverer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().insert(rid(recipient));
    }

    pub fn panic_for(&self, recipient: &str) {
        self.panicking.lock().unwrap().insert(rid(recipient));
    }

    pub fn delivered(&self) -> Vec<(RecipientId, ChangeSet)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.delivered()
            .into_iter()
            .map(|(r, _)| r.to_string())
            .collect()
    }
}

#[async_trait]
impl Deliverer for RecordingDeliverer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, recipient: &RecipientId, change_set: &ChangeSet) -> bool {
        if self.panicking.lock().unwrap().contains(recipient) {
            panic!("deliverer exploded for {recipient}");
        }
        if self.failing.lock().unwrap().contains(recipient) {
            return false;
        }
        self.delivered
            .lock()
            .unwrap()
            .push((recipient.clone(), change_set.clone()));
        true
    }
}

// ── Controller ──────────────────────────────────────────────────

pub struct Harness {
    pub controller: Arc<MonitorController>,
    pub fetcher: Arc<FakeFetcher>,
    pub deliverer: Arc<RecordingDeliverer>,
}

pub fn harness() -> Harness {
    harness_with(MonitorConfig::default(), true)
}

pub fn harness_with(config: MonitorConfig, notifications: bool) -> Harness {
    build_harness(SnapshotStore::in_memory(), config, notifications)
}

/// Harness over a caller-supplied snapshot store, e.g. one backed by a
/// temporary directory.
pub fn harness_on(snapshots: SnapshotStore) -> Harness {
    build_harness(snapshots, MonitorConfig::default(), true)
}

fn build_harness(snapshots: SnapshotStore, config: MonitorConfig, notifications: bool) -> Harness {
    let fetcher = FakeFetcher::new();
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), notifications);
    let controller = MonitorController::new(
        fetcher.clone(),
        Arc::new(Registry::in_memory()),
        Arc::new(snapshots),
        router,
        config,
    );
    Harness {
        controller: Arc::new(controller),
        fetcher,
        deliverer,
    }
}
