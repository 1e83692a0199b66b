use super::{ByteStore, StoreError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory store, used by tests and embedders that do not need durability
#[derive(Default)]
pub struct MemoryByteStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl ByteStore for MemoryByteStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
