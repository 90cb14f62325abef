//! Playlist change monitoring for Heylisten.
//!
//! This crate watches remote playlists and tells recipients what changed:
//! - [`PlaylistFetcher`]: reads the current state of a playlist
//!   ([`SpotifyFetcher`] in production)
//! - [`diff`]: compares two snapshots of the same playlist
//! - [`MonitorController`]: runs monitoring cycles and on-demand operations
//! - [`NotificationRouter`]: fans change-sets out to a [`Deliverer`]
//! - [`Scheduler`]: drives cycles at a fixed interval
//!
//! # Cycle
//!
//! ```text
//! Registry ──list──► Controller ──fetch──► PlaylistFetcher
//!                        │
//!                        ├──get/put──► SnapshotStore
//!                        ├──diff
//!                        └──change-sets──► NotificationRouter ──► Deliverer
//! ```
//!
//! Notifications are at-most-once: the stored snapshot advances whether or
//! not delivery succeeds.
//!
//! # Example
//!
//! ```
//! use heylisten_monitor::diff;
//! use heylisten_types::{Item, PlaylistId, Snapshot};
//!
//! let id = PlaylistId::parse("37i9dQZF1DXcBWIGoYBM5M").unwrap();
//! let old = Snapshot::new(id.clone(), "Hits", "v1")
//!     .with_items(vec![Item::new("t1", "One").added("2023-01-01T00:00:00Z", None)]);
//! let new = Snapshot::new(id, "Hits", "v2")
//!     .with_items(vec![Item::new("t2", "Two").added("2023-01-02T00:00:00Z", None)]);
//!
//! let changes = diff(&old, &new);
//! assert_eq!(changes.added[0].id, "t2");
//! assert_eq!(changes.removed[0].id, "t1");
//! ```

mod controller;
mod diff;
mod error;
pub mod notify;
mod report;
mod scheduler;
pub mod source;

pub use controller::{AddedPlaylist, MonitorConfig, MonitorController};
pub use diff::{diff, SnapshotDiff};
pub use error::{FetchError, FetchResult, MonitorError, MonitorResult};
pub use notify::{Deliverer, DeliveryReport, DiscordDeliverer, LogDeliverer, NotificationRouter};
pub use report::{CycleReport, CycleSummary, EntityError, EntityReport, EntityStatus};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use source::spotify::{SpotifyConfig, SpotifyFetcher};
pub use source::PlaylistFetcher;
