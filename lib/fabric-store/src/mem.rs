//! In-memory store for tests

use crate::{Result, StateStore, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory `StateStore` used by unit tests across the workspace. Not a
/// production backend: nothing is persisted or replicated.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, for test assertions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StateStore for MemStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn read_all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::delete_existing;

    #[tokio::test]
    async fn read_write_delete() {
        let store = MemStore::new();
        store.write("/a/b", b"v1").await.unwrap();
        assert_eq!(store.read("/a/b").await.unwrap(), b"v1");

        store.write("/a/b", b"v2").await.unwrap();
        assert_eq!(store.read("/a/b").await.unwrap(), b"v2");

        store.delete("/a/b").await.unwrap();
        assert!(matches!(
            store.read("/a/b").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemStore::new();
        assert!(matches!(
            store.read("/nope").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("/nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn read_all_scopes_to_prefix() {
        let store = MemStore::new();
        store.write("/nets/a", b"1").await.unwrap();
        store.write("/nets/b", b"2").await.unwrap();
        store.write("/eps/c", b"3").await.unwrap();

        let values = store.read_all("/nets/").await.unwrap();
        assert_eq!(values.len(), 2);

        let empty = store.read_all("/missing/").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn delete_existing_tolerates_absence() {
        let store = MemStore::new();
        delete_existing(&store, "/nope").await.unwrap();
        store.write("/k", b"v").await.unwrap();
        delete_existing(&store, "/k").await.unwrap();
        delete_existing(&store, "/k").await.unwrap();
    }
}
