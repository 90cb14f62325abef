//! Reading and writing whole JSON documents.

use crate::error::StorageResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, warn};

/// Outcome of reading a document from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    Missing,
    Malformed,
    Found(T),
}

impl<T> Loaded<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Loaded::Found(value) => Some(value),
            Loaded::Missing | Loaded::Malformed => None,
        }
    }
}

/// Reads and parses a document. Never fails: unreadable and unparseable
/// documents are logged and reported as [`Loaded::Malformed`].
pub async fn read_document<T: DeserializeOwned>(path: &Path) -> Loaded<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No document at {}", path.display());
            return Loaded::Missing;
        }
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return Loaded::Malformed;
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("Empty document at {}", path.display());
        return Loaded::Missing;
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => Loaded::Found(value),
        Err(e) => {
            error!("Error decoding JSON from {}: {}", path.display(), e);
            Loaded::Malformed
        }
    }
}

/// Serializes `value` and replaces the document at `path`.
pub async fn write_document<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp = temp_path(path);
    fs::write(&tmp, &json).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
