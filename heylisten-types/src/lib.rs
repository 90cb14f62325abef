//! Core type definitions for Heylisten.
//!
//! This crate defines the data model shared by the storage layer, the
//! monitor and the server:
//! - Playlist and recipient identifiers
//! - Playlist snapshots and their items
//! - Registry entries (who monitors what)
//! - Change-sets produced by a monitoring cycle
//!
//! Nothing in here performs I/O.

mod change;
mod ids;
mod playlist;
mod registry;

pub use change::ChangeSet;
pub use ids::{PlaylistId, RecipientId};
pub use playlist::{Item, PlaylistInfo, Snapshot, UNKNOWN_ARTIST, UNKNOWN_ITEM_ID, UNKNOWN_ITEM_NAME};
pub use registry::RegistryEntry;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid playlist id: {0:?}")]
    InvalidPlaylistId(String),

    #[error("invalid recipient id: {0:?}")]
    InvalidRecipientId(String),
}
