//! Namespaces, metadata and change events for the queue store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition of the store. Each namespace is one directory under the
/// store root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Product URLs waiting for extraction
    QueueProduct,
    /// Shop URLs waiting for pagination
    QueueShop,
    /// Extracted product records, keyed like their queue entry
    ProcessedProduct,
    /// Completion markers for listing pages, keyed by page index
    ProcessedMainPage,
}

impl Namespace {
    /// Directory name of the namespace on disk
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueueProduct => "queue-product",
            Self::QueueShop => "queue-shop",
            Self::ProcessedProduct => "processed-product",
            Self::ProcessedMainPage => "processed-main-page",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-key metadata. Values are expected to be JSON scalars.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Value written (created or overwritten)
    Put,
    /// Value removed
    Remove,
    /// Metadata patched; the value itself is unchanged
    Metadata,
}

/// Change notification delivered to every subscriber of a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub kind: ChangeKind,
    pub namespace: Namespace,
    pub key: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StoreEvent {
    #[must_use]
    pub fn new(kind: ChangeKind, namespace: Namespace, key: impl Into<String>) -> Self {
        Self {
            kind,
            namespace,
            key: key.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn is_put(&self) -> bool {
        self.kind == ChangeKind::Put
    }
}
