//! Core `QueueStore` struct and constructor

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{debug, info, trace};

use super::errors::StoreError;
use super::types::{ChangeKind, Namespace, StoreEvent};

/// Writers touching the same key serialize on one of these stripes, which keeps
/// change events for a key in write order.
const LOCK_STRIPES: usize = 64;

pub(super) const META_SUFFIX: &str = ".meta";
const MAX_KEY_LEN: usize = 128;

/// Handle to an on-disk store. Cheap to clone; clones share the change feed.
#[derive(Debug, Clone)]
pub struct QueueStore {
    pub(super) inner: Arc<StoreInner>,
}

#[derive(Debug)]
pub(super) struct StoreInner {
    pub(super) root: PathBuf,
    pub(super) sender: broadcast::Sender<StoreEvent>,
    stripes: Box<[Mutex<()>]>,
}

impl QueueStore {
    /// Open (creating if needed) the store rooted at `root`
    ///
    /// `event_capacity` bounds how many change events a slow subscriber may
    /// fall behind before it observes a lag.
    pub async fn open(root: impl Into<PathBuf>, event_capacity: usize) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::unavailable(&root, e))?;

        let (sender, _) = broadcast::channel(event_capacity.max(1));
        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();

        info!("Opened queue store at {}", root.display());
        Ok(Self {
            inner: Arc::new(StoreInner {
                root,
                sender,
                stripes,
            }),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    #[must_use]
    pub fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.inner.root.join(namespace.as_str())
    }

    pub(super) fn value_path(&self, namespace: Namespace, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(key)
    }

    pub(super) fn meta_path(&self, namespace: Namespace, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(meta_file_name(key))
    }

    pub(super) async fn ensure_namespace(&self, namespace: Namespace) -> Result<PathBuf, StoreError> {
        let dir = self.namespace_dir(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::unavailable(&dir, e))?;
        Ok(dir)
    }

    pub(super) async fn lock_key(&self, namespace: Namespace, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        (namespace, key).hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.inner.stripes.len();
        self.inner.stripes[idx].lock().await
    }

    /// Announce a change. Must be called while holding the key's stripe lock.
    pub(super) fn publish(&self, kind: ChangeKind, namespace: Namespace, key: &str) {
        let event = StoreEvent::new(kind, namespace, key);
        match self.inner.sender.send(event) {
            Ok(n) => trace!("{kind:?} {namespace}/{key} announced to {n} subscribers"),
            Err(_) => trace!("{kind:?} {namespace}/{key} (no subscribers)"),
        }
    }
}

pub(super) fn meta_file_name(key: &str) -> String {
    format!("{key}{META_SUFFIX}")
}

pub(super) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        debug!("Rejected store key {key:?}");
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_digests_and_page_indexes() {
        assert!(validate_key("0a1b2c3d4e5f").is_ok());
        assert!(validate_key("42").is_ok());
        assert!(validate_key("shop_page-2").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        for key in ["", "../escape", "a/b", "x.meta", ".tmp-x", "with space"] {
            assert!(
                matches!(validate_key(key), Err(StoreError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        assert!(validate_key(&"f".repeat(MAX_KEY_LEN + 1)).is_err());
    }
}
