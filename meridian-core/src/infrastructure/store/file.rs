// meridian-core/src/infrastructure/store/file.rs
//
// The single-writer embedded file store: one file per key under a base
// directory, written with an atomic rename-on-write helper. Not a real
// B-tree -- no paging, no WAL -- only the `Store` trait's external contract
// is in scope. A `tokio::sync::Mutex` serializes commits so `version_of`
// reads taken inside a commit observe a consistent view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::infrastructure::fs::atomic_write;
use crate::ports::store::{Store, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    version: u64,
    #[serde(with = "hex_bytes")]
    value: Vec<u8>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

pub struct FileStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), write_lock: Mutex::new(()) }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.base_dir.join(digest)
    }

    async fn read_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let record: Record =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Io(e.to_string()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<Record>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::Io(e.to_string()))? {
            let bytes = match tokio::fs::read(entry.path()).await {
                Ok(b) => b,
                Err(_) => continue,
            };
            if let Ok(record) = serde_json::from_slice::<Record>(&bytes) {
                if record.key.starts_with(prefix) {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }
}

fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(path).map_err(|e| StoreError::Io(e.to_string()))
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read_record(key).await?.map(|r| r.value))
    }

    async fn range(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut records = self.scan(prefix).await?;
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn version_of(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.read_record(key).await?.map(|r| r.version).unwrap_or(0))
    }

    async fn commit(
        &self,
        read_versions: &HashMap<String, u64>,
        writes: &HashMap<String, Option<Vec<u8>>>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        ensure_dir(&self.base_dir)?;

        for (key, expected) in read_versions {
            let actual = self.read_record(key).await?.map(|r| r.version).unwrap_or(0);
            if actual != *expected {
                return Err(StoreError::ConflictRetry);
            }
        }

        for (key, value) in writes {
            let path = self.path_for(key);
            match value {
                Some(bytes) => {
                    let version = self.read_record(key).await?.map(|r| r.version + 1).unwrap_or(1);
                    let record = Record { key: key.clone(), version, value: bytes.clone() };
                    let encoded = serde_json::to_vec(&record).map_err(|e| StoreError::Io(e.to_string()))?;
                    atomic_write(&path, &encoded).map_err(|e| StoreError::Io(e.to_string()))?;
                }
                None => {
                    if path.exists() {
                        std::fs::remove_file(&path).map_err(|e| StoreError::Io(e.to_string()))?;
                    }
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
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut writes = HashMap::new();
        writes.insert("/object/p/Service/kafka@1".to_string(), Some(b"payload".to_vec()));
        store.commit(&HashMap::new(), &writes).await.unwrap();
        assert_eq!(store.get("/object/p/Service/kafka@1").await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn stale_read_version_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut first = HashMap::new();
        first.insert("k".to_string(), Some(b"v1".to_vec()));
        store.commit(&HashMap::new(), &first).await.unwrap();

        let mut stale = HashMap::new();
        stale.insert("k".to_string(), 0u64);
        let mut second = HashMap::new();
        second.insert("k".to_string(), Some(b"v2".to_vec()));
        let result = store.commit(&stale, &second).await;
        assert!(matches!(result, Err(StoreError::ConflictRetry)));
    }
}
