use super::Deliverer;
use async_trait::async_trait;
use heylisten_types::{ChangeSet, Item, RecipientId};
use tracing::{debug, info};

/// Items listed per direction before the rest is summarized.
const PREVIEW_LIMIT: usize = 5;

/// Deliverer that only writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDeliverer;

impl LogDeliverer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Deliverer for LogDeliverer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, recipient: &RecipientId, change_set: &ChangeSet) -> bool {
        info!(
            "Notification for user {}: playlist '{}' changed ({})",
            recipient,
            change_set.playlist_name,
            change_set.summary()
        );
        preview("Added", &change_set.added);
        preview("Removed", &change_set.removed);
        true
    }
}

fn preview(label: &str, items: &[Item]) {
    for item in items.iter().take(PREVIEW_LIMIT) {
        debug!("  {}: {} by {}", label, item.name, item.artist_line());
    }
    if items.len() > PREVIEW_LIMIT {
        debug!("  ... and {} more", items.len() - PREVIEW_LIMIT);
    }
}
