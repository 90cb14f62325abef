//! Discord webhook delivery.
//!
//! Each recipient registers one webhook URL. Registrations are kept in
//! `discord_webhooks.json`, a JSON object mapping recipient id to URL.

use super::Deliverer;
use crate::error::{MonitorError, MonitorResult};
use async_trait::async_trait;
use heylisten_storage::{read_document, write_document, Loaded};
use heylisten_types::{ChangeSet, Item, RecipientId};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// File name of the webhook registry inside the data directory.
pub const WEBHOOKS_FILE_NAME: &str = "discord_webhooks.json";

/// Embed colour (blue).
const EMBED_COLOR: u32 = 3_447_003;

/// Items listed per field before the rest is summarized.
const FIELD_LIMIT: usize = 10;

/// Discord rejects embeds whose field values exceed this many characters.
const FIELD_VALUE_MAX_CHARS: usize = 1024;

/// Delivers change-sets as Discord webhook embeds.
pub struct DiscordDeliverer {
    path: Option<PathBuf>,
    client: Client,
    webhooks: Mutex<BTreeMap<RecipientId, String>>,
}

impl DiscordDeliverer {
    /// Opens the webhook registry at `path`. A missing or malformed document
    /// starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> MonitorResult<Self> {
        let path = path.into();
        let webhooks = match read_document(&path).await {
            Loaded::Found(map) => map,
            Loaded::Missing => BTreeMap::new(),
            Loaded::Malformed => {
                error!("Ignoring unreadable webhook registry at {}", path.display());
                BTreeMap::new()
            }
        };
        info!("Loaded {} Discord webhook(s)", webhooks.len());
        Ok(Self {
            path: Some(path),
            client: build_client()?,
            webhooks: Mutex::new(webhooks),
        })
    }

    /// Creates a deliverer with no backing file.
    pub fn in_memory() -> MonitorResult<Self> {
        Ok(Self {
            path: None,
            client: build_client()?,
            webhooks: Mutex::new(BTreeMap::new()),
        })
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers (or replaces) the webhook URL for `recipient`.
    pub async fn register_webhook(&self, recipient: RecipientId, url: &str) -> MonitorResult<()> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| MonitorError::InvalidInput(format!("invalid webhook URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MonitorError::InvalidInput(format!(
                "webhook URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut webhooks = self.webhooks.lock().await;
        let mut updated = webhooks.clone();
        updated.insert(recipient.clone(), parsed.to_string());
        if let Some(path) = &self.path {
            write_document(path, &updated).await?;
        }
        *webhooks = updated;
        info!("Registered Discord webhook for user {}", recipient);
        Ok(())
    }

    /// Returns the webhook URL registered for `recipient`.
    pub async fn webhook_for(&self, recipient: &RecipientId) -> Option<String> {
        self.webhooks.lock().await.get(recipient).cloned()
    }

    async fn send(&self, url: &str, change_set: &ChangeSet) -> MonitorResult<()> {
        let payload = json!({ "embeds": [build_embed(change_set)] });
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(MonitorError::Delivery(format!("webhook answered {status}: {body}")))
        }
    }
}

#[async_trait]
impl Deliverer for DiscordDeliverer {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, recipient: &RecipientId, change_set: &ChangeSet) -> bool {
        let Some(url) = self.webhook_for(recipient).await else {
            warn!("No Discord webhook configured for user {}", recipient);
            return false;
        };

        match self.send(&url, change_set).await {
            Ok(()) => {
                info!("Discord notification sent successfully for user {}", recipient);
                true
            }
            Err(e) => {
                error!("Failed to send Discord notification to user {}: {}", recipient, e);
                false
            }
        }
    }
}

/// Builds the Discord embed describing `change_set`.
pub fn build_embed(change_set: &ChangeSet) -> Value {
    let mut fields = Vec::new();
    if !change_set.added.is_empty() {
        fields.push(json!({
            "name": "🆕 Added Tracks",
            "value": field_text(&change_set.added, |item| format!(
                "• {} by {} (added by {})",
                item.name,
                item.artist_line(),
                item.added_by_display()
            )),
        }));
    }
    if !change_set.removed.is_empty() {
        fields.push(json!({
            "name": "❌ Removed Tracks",
            "value": field_text(&change_set.removed, |item| format!(
                "• {} by {}",
                item.name,
                item.artist_line()
            )),
        }));
    }

    json!({
        "title": format!("Playlist '{}' Updated", change_set.playlist_name),
        "description": format!(
            "**{}** tracks added, **{}** tracks removed",
            change_set.added.len(),
            change_set.removed.len()
        ),
        "color": EMBED_COLOR,
        "fields": fields,
    })
}

fn field_text(items: &[Item], line: impl Fn(&Item) -> String) -> String {
    let mut text = items
        .iter()
        .take(FIELD_LIMIT)
        .map(line)
        .collect::<Vec<_>>()
        .join("\n");
    if items.len() > FIELD_LIMIT {
        text.push_str(&format!("\n... and {} more", items.len() - FIELD_LIMIT));
    }
    if text.chars().count() > FIELD_VALUE_MAX_CHARS {
        text = text.chars().take(FIELD_VALUE_MAX_CHARS - 3).collect();
        text.push_str("...");
    }
    text
}

fn build_client() -> MonitorResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| MonitorError::Config(format!("failed to create HTTP client: {e}")))
}
