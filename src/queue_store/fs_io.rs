//! Durable file primitives used by the store
//!
//! Writes go to a hidden temp file, are fsynced, then renamed over the target so
//! a reader never observes a partial value.

use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::errors::StoreError;

pub(super) const TMP_PREFIX: &str = ".tmp-";

pub(super) async fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let target = dir.join(name);
    let tmp = dir.join(format!("{TMP_PREFIX}{name}-{}", uuid::Uuid::new_v4().simple()));

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| StoreError::unavailable(&tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::unavailable(&tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::unavailable(&tmp, e))?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StoreError::unavailable(&target, e));
    }

    sync_dir(dir).await
}

/// Read a file, mapping "not found" to `None`
pub(super) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::unavailable(path, e)),
    }
}

/// Remove a file; returns whether it existed
pub(super) async fn remove_optional(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::unavailable(path, e)),
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    let handle = tokio::fs::File::open(dir)
        .await
        .map_err(|e| StoreError::unavailable(dir, e))?;
    handle
        .sync_all()
        .await
        .map_err(|e| StoreError::unavailable(dir, e))
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}
