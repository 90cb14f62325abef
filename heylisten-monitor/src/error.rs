//! Error types for the monitor.

use heylisten_storage::StorageError;
use heylisten_types::PlaylistId;
use std::time::Duration;
use thiserror::Error;

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Result type for fetch collaborators.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur in monitor operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetching one playlist failed. Recovered by skipping that playlist
    /// for the current cycle.
    #[error("failed to fetch playlist {playlist}: {source}")]
    Fetch {
        playlist: PlaylistId,
        #[source]
        source: FetchError,
    },

    /// Reading or writing persisted state failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Sending a notification failed.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// The playlist is not in the registry.
    #[error("playlist {0} is not monitored")]
    NotMonitored(PlaylistId),

    /// A caller supplied an unusable value.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<heylisten_types::Error> for MonitorError {
    fn from(e: heylisten_types::Error) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

/// Errors reported by a [`PlaylistFetcher`](crate::PlaylistFetcher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network error or unexpected status code.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials were rejected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The playlist does not exist (or is not visible to us).
    #[error("playlist not found: {0}")]
    NotFound(String),

    /// The service kept answering 429.
    #[error("rate limited by the remote service")]
    RateLimited,

    /// The response body could not be understood.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The fetch did not finish within its time budget.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch task panicked or was cancelled.
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}
