//! Errors raised by the snapshot store and the registry.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// A document could not be written, or a directory could not be created.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure while creating, writing or renaming a document.
    #[error("document I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded as JSON.
    #[error("document encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
