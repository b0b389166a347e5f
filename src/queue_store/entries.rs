//! Value operations: put, get, list, delete

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::core::{META_SUFFIX, QueueStore, validate_key};
use super::errors::StoreError;
use super::fs_io::{TMP_PREFIX, read_optional, remove_optional, write_atomic};
use super::types::{ChangeKind, Metadata, Namespace};

impl QueueStore {
    /// Write `value` under `namespace/key`, replacing any previous value
    ///
    /// When `metadata` is given it replaces the entry's metadata as well.
    /// The write is on disk before this returns, and a `Put` event follows it.
    pub async fn put<V>(
        &self,
        namespace: Namespace,
        key: &str,
        value: &V,
        metadata: Option<&Metadata>,
    ) -> Result<(), StoreError>
    where
        V: Serialize + ?Sized,
    {
        validate_key(key)?;
        let bytes = encode(namespace, key, value)?;
        let meta_bytes = metadata.map(|m| encode(namespace, key, m)).transpose()?;

        let _guard = self.lock_key(namespace, key).await;
        let dir = self.ensure_namespace(namespace).await?;
        write_atomic(&dir, key, &bytes).await?;
        if let Some(meta_bytes) = meta_bytes {
            write_atomic(&dir, &super::core::meta_file_name(key), &meta_bytes).await?;
        }
        self.publish(ChangeKind::Put, namespace, key);
        Ok(())
    }

    /// Write several entries to one namespace. Not transactional: entries written
    /// before a failure stay written.
    pub async fn put_many<V, I>(&self, namespace: Namespace, entries: I) -> Result<usize, StoreError>
    where
        V: Serialize,
        I: IntoIterator<Item = (String, V)>,
    {
        let mut written = 0;
        for (key, value) in entries {
            self.put(namespace, &key, &value, None).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Read and decode a value; `None` when the key is absent
    pub async fn get<V>(&self, namespace: Namespace, key: &str) -> Result<Option<V>, StoreError>
    where
        V: DeserializeOwned,
    {
        validate_key(key)?;
        let Some(bytes) = read_optional(&self.value_path(namespace, key)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                namespace,
                key: key.to_string(),
                source,
            })
    }

    pub async fn has(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let path = self.value_path(namespace, key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::unavailable(&path, e))
    }

    /// All keys currently present in `namespace`, sorted
    pub async fn list_keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        let dir = self.namespace_dir(namespace);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::unavailable(&dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| StoreError::unavailable(&dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TMP_PREFIX) || name.ends_with(META_SUFFIX) {
                continue;
            }
            keys.push(name.to_string());
        }
        keys.sort_unstable();
        Ok(keys)
    }

    /// Keys and decoded values of `namespace`, in key order
    ///
    /// Entries deleted between listing and reading are skipped.
    pub async fn get_items<V>(&self, namespace: Namespace) -> Result<Vec<(String, V)>, StoreError>
    where
        V: DeserializeOwned,
    {
        let keys = self.list_keys(namespace).await?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(namespace, &key).await? {
                items.push((key, value));
            }
        }
        Ok(items)
    }

    /// Remove `namespace/key`. Removing an absent key is not an error.
    pub async fn delete(
        &self,
        namespace: Namespace,
        key: &str,
        drop_metadata: bool,
    ) -> Result<(), StoreError> {
        validate_key(key)?;
        let _guard = self.lock_key(namespace, key).await;
        let existed = remove_optional(&self.value_path(namespace, key)).await?;
        if drop_metadata {
            remove_optional(&self.meta_path(namespace, key)).await?;
        }
        if !existed {
            debug!("Delete of absent entry {namespace}/{key}");
        }
        self.publish(ChangeKind::Remove, namespace, key);
        Ok(())
    }
}

fn encode<V: Serialize + ?Sized>(
    namespace: Namespace,
    key: &str,
    value: &V,
) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        namespace,
        key: key.to_string(),
        source,
    })
}
