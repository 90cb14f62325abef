//! Notification delivery.
//!
//! A [`Deliverer`] sends one change-set to one recipient. The
//! [`NotificationRouter`] takes the batch produced by a cycle and fans it out
//! to a deliverer, isolating failures per change-set.

pub mod discord;
mod log;
mod router;

use async_trait::async_trait;
use heylisten_types::{ChangeSet, RecipientId};

pub use discord::{DiscordDeliverer, WEBHOOKS_FILE_NAME};
pub use log::LogDeliverer;
pub use router::{DeliveryReport, NotificationRouter};

/// Sends change notifications to recipients.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Returns the channel name, for logs.
    fn name(&self) -> &'static str;

    /// Delivers `change_set` to `recipient`. Returns false on failure; never
    /// errors.
    async fn deliver(&self, recipient: &RecipientId, change_set: &ChangeSet) -> bool;
}
