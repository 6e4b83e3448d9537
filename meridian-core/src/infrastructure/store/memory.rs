// meridian-core/src/infrastructure/store/memory.rs
//
// The default `Store` driver: an in-memory `BTreeMap` guarded by a
// `tokio::sync::RwLock`, each value paired with the version bumped on every
// write. Used by the resolver/diff/enforcement pipeline and by every unit
// test in this crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ports::store::{Store, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    version: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { data: RwLock::new(BTreeMap::new()) }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().await.get(key).map(|e| e.value.clone()))
    }

    async fn range(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }

    async fn version_of(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.data.read().await.get(key).map(|e| e.version).unwrap_or(0))
    }

    async fn commit(
        &self,
        read_versions: &std::collections::HashMap<String, u64>,
        writes: &std::collections::HashMap<String, Option<Vec<u8>>>,
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        for (key, expected) in read_versions {
            let actual = data.get(key).map(|e| e.version).unwrap_or(0);
            if actual != *expected {
                return Err(StoreError::ConflictRetry);
            }
        }
        for (key, value) in writes {
            match value {
                Some(bytes) => {
                    let version = data.get(key).map(|e| e.version + 1).unwrap_or(1);
                    data.insert(key.clone(), Entry { value: bytes.clone(), version });
                }
                None => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        let mut writes = std::collections::HashMap::new();
        writes.insert("/object/p/Service/kafka@1".to_string(), Some(b"payload".to_vec()));
        store.commit(&std::collections::HashMap::new(), &writes).await.unwrap();
        assert_eq!(store.get("/object/p/Service/kafka@1").await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn stale_read_version_conflicts() {
        let store = MemoryStore::new();
        let mut first = std::collections::HashMap::new();
        first.insert("k".to_string(), Some(b"v1".to_vec()));
        store.commit(&std::collections::HashMap::new(), &first).await.unwrap();

        let mut stale_reads = std::collections::HashMap::new();
        stale_reads.insert("k".to_string(), 0u64);
        let mut second = std::collections::HashMap::new();
        second.insert("k".to_string(), Some(b"v2".to_vec()));
        let result = store.commit(&stale_reads, &second).await;
        assert!(matches!(result, Err(StoreError::ConflictRetry)));
    }

    #[tokio::test]
    async fn range_respects_prefix() {
        let store = MemoryStore::new();
        let mut writes = std::collections::HashMap::new();
        writes.insert("/object/p/Service/a@1".to_string(), Some(b"a".to_vec()));
        writes.insert("/object/p/Cluster/b@1".to_string(), Some(b"b".to_vec()));
        store.commit(&std::collections::HashMap::new(), &writes).await.unwrap();
        let found = store.range("/object/p/Service/").await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
