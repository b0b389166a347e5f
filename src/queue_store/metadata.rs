//! Per-key metadata operations

use super::core::{QueueStore, meta_file_name, validate_key};
use super::errors::StoreError;
use super::fs_io::{read_optional, write_atomic};
use super::types::{ChangeKind, Metadata, Namespace};

impl QueueStore {
    /// Metadata of `namespace/key`; empty when none was ever written
    pub async fn get_metadata(&self, namespace: Namespace, key: &str) -> Result<Metadata, StoreError> {
        validate_key(key)?;
        self.read_metadata(namespace, key).await
    }

    /// Merge `patch` into the key's metadata. Fields not named in `patch` keep
    /// their previous values.
    pub async fn set_metadata(
        &self,
        namespace: Namespace,
        key: &str,
        patch: &Metadata,
    ) -> Result<(), StoreError> {
        validate_key(key)?;
        let _guard = self.lock_key(namespace, key).await;

        let mut merged = self.read_metadata(namespace, key).await?;
        for (field, value) in patch {
            merged.insert(field.clone(), value.clone());
        }
        let bytes = serde_json::to_vec(&merged).map_err(|source| StoreError::Encode {
            namespace,
            key: key.to_string(),
            source,
        })?;

        let dir = self.ensure_namespace(namespace).await?;
        write_atomic(&dir, &meta_file_name(key), &bytes).await?;
        self.publish(ChangeKind::Metadata, namespace, key);
        Ok(())
    }

    async fn read_metadata(&self, namespace: Namespace, key: &str) -> Result<Metadata, StoreError> {
        let Some(bytes) = read_optional(&self.meta_path(namespace, key)).await? else {
            return Ok(Metadata::new());
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            namespace,
            key: key.to_string(),
            source,
        })
    }
}
