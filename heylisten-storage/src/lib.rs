//! JSON document storage for Heylisten.
//!
//! Two logical documents are persisted:
//! - the [`Registry`]: one JSON array listing every monitoring relationship
//! - the [`SnapshotStore`]: one JSON document per playlist holding its last
//!   observed snapshot
//!
//! Both stores tolerate missing and malformed documents by treating them as
//! "no data yet". Documents are written to a temporary sibling file and
//! renamed into place.
//!
//! Each store also has an in-memory mode with no backing file, used by tests
//! and by callers that do not need persistence.

mod document;
mod error;
mod registry;
mod snapshot_store;

pub use document::{read_document, write_document, Loaded};
pub use error::{StorageError, StorageResult};
pub use registry::{Registry, UpsertOutcome, REGISTRY_FILE_NAME};
pub use snapshot_store::{SnapshotStore, SNAPSHOT_DIR_NAME};
