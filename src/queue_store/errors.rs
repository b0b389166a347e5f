//! Error types for queue store operations

use std::path::{Path, PathBuf};

use super::types::Namespace;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage medium could not be read or written. Fatal for the run.
    #[error("Storage unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored value or metadata file could not be decoded
    #[error("Corrupt entry {namespace}/{key}: {source}")]
    Corrupt {
        namespace: Namespace,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized for writing
    #[error("Failed to encode {namespace}/{key}: {source}")]
    Encode {
        namespace: Namespace,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Keys become file names, so only `[A-Za-z0-9_-]` is accepted
    #[error("Invalid store key {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    pub(crate) fn unavailable(path: &Path, source: std::io::Error) -> Self {
        Self::Unavailable {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
