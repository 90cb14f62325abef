//! Sources of playlist snapshots.

pub mod spotify;

use crate::error::FetchResult;
use async_trait::async_trait;
use heylisten_types::{PlaylistId, Snapshot};

/// Fetches the current state of a playlist from a remote service.
///
/// Implementations resolve pagination before returning, so a snapshot always
/// holds the full item list.
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Returns the provider name.
    fn provider_name(&self) -> &'static str;

    /// Fetches the playlist, optionally restricted to a market.
    async fn fetch_playlist(&self, id: &PlaylistId, market: Option<&str>) -> FetchResult<Snapshot>;
}
