use super::Deliverer;
use heylisten_types::{ChangeSet, PlaylistId, RecipientId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of routing one batch of change-sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Change-sets the deliverer accepted.
    pub delivered: usize,
    /// Change-sets the deliverer rejected.
    pub failed: usize,
    /// Change-sets dropped because no recipient owns the playlist.
    pub unowned: usize,
    /// Change-sets logged but not sent because notifications are disabled.
    pub disabled: usize,
    /// Empty or duplicate change-sets dropped before dispatch.
    pub skipped: usize,
    /// Recipients with at least one failed delivery.
    pub failed_recipients: Vec<RecipientId>,
}

/// Fans change-sets out to a [`Deliverer`], one recipient at a time.
pub struct NotificationRouter {
    deliverer: Arc<dyn Deliverer>,
    enabled: bool,
}

impl NotificationRouter {
    pub fn new(deliverer: Arc<dyn Deliverer>, enabled: bool) -> Self {
        Self { deliverer, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn deliverer(&self) -> &Arc<dyn Deliverer> {
        &self.deliverer
    }

    /// Delivers every change-set that has a recipient.
    ///
    /// Never fails. A failed or panicking delivery is counted and logged and
    /// does not affect the other change-sets in the batch.
    pub async fn route(&self, change_sets: Vec<ChangeSet>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut seen: HashSet<(PlaylistId, Option<RecipientId>)> = HashSet::new();
        let mut by_recipient: BTreeMap<RecipientId, Vec<ChangeSet>> = BTreeMap::new();

        for change_set in change_sets {
            if change_set.is_empty()
                || !seen.insert((change_set.playlist_id.clone(), change_set.recipient.clone()))
            {
                report.skipped += 1;
                continue;
            }
            match change_set.recipient.clone() {
                Some(recipient) => by_recipient.entry(recipient).or_default().push(change_set),
                None => {
                    debug!(
                        "No user associated with playlist {}, skipping notification",
                        change_set.playlist_id
                    );
                    report.unowned += 1;
                }
            }
        }

        for (recipient, change_sets) in by_recipient {
            let mut recipient_failed = false;
            for change_set in change_sets {
                if !self.enabled {
                    debug!(
                        "Notifications disabled. Would have notified user {} about changes to '{}' ({})",
                        recipient,
                        change_set.playlist_name,
                        change_set.summary()
                    );
                    report.disabled += 1;
                    continue;
                }

                if self.dispatch(&recipient, change_set).await {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                    recipient_failed = true;
                }
            }
            if recipient_failed {
                report.failed_recipients.push(recipient);
            }
        }

        if report.delivered + report.failed > 0 {
            info!(
                "Delivered {} notification(s) via {}, {} failed",
                report.delivered,
                self.deliverer.name(),
                report.failed
            );
        }
        report
    }

    /// Runs one delivery on its own task so a panic stays contained.
    async fn dispatch(&self, recipient: &RecipientId, change_set: ChangeSet) -> bool {
        let deliverer = Arc::clone(&self.deliverer);
        let target = recipient.clone();
        let playlist = change_set.playlist_id.clone();
        let task = tokio::spawn(async move { deliverer.deliver(&target, &change_set).await });

        match task.await {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    "Failed to notify user {} about playlist {}",
                    recipient, playlist
                );
                false
            }
            Err(e) => {
                error!(
                    "Delivery to user {} about playlist {} aborted: {}",
                    recipient, playlist, e
                );
                false
            }
        }
    }
}
