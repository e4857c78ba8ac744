use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{ObjectStorage, StorageError};

/// In-process bucket
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, path: &str, data: Bytes, upsert: bool) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        if !upsert && objects.contains_key(path) {
            return Err(StorageError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError> {
        if !self.contains(path).await {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!(
            "memory://{}?expires_in={}",
            path,
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_without_upsert_rejects_existing() {
        let storage = MemoryStorage::new();
        storage.upload("u/a.tar", Bytes::from_static(b"one"), false).await.unwrap();

        let err = storage
            .upload("u/a.tar", Bytes::from_static(b"two"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Api { status: 409, .. }));

        storage.upload("u/a.tar", Bytes::from_static(b"two"), true).await.unwrap();
        assert_eq!(storage.download("u/a.tar").await.unwrap(), Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_remove_ignores_missing() {
        let storage = MemoryStorage::new();
        storage
            .remove(&["nothing/here.tar".to_string()])
            .await
            .unwrap();
        assert_eq!(storage.len().await, 0);
    }
}
