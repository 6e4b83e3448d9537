// meridian-core/src/domain/store/txn.rs
//
// The only path to a multi-key write: no caller
// in this crate writes to a `Store` directly, they buffer reads/writes on a
// `Txn` and call `commit`, which the underlying store applies atomically or
// rejects with `StoreError::ConflictRetry`.

use std::collections::HashMap;

use crate::ports::store::{Store, StoreError};

pub struct Txn<'s> {
    store: &'s dyn Store,
    read_versions: HashMap<String, u64>,
    writes: HashMap<String, Option<Vec<u8>>>,
}

impl<'s> Txn<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Self { store, read_versions: HashMap::new(), writes: HashMap::new() }
    }

    /// Reads `key`, honoring any uncommitted write already buffered in this
    /// transaction, and records the version observed so `commit` can detect
    /// a conflicting write from elsewhere.
    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let version = self.store.version_of(key).await?;
        self.read_versions.entry(key.to_string()).or_insert(version);
        self.store.get(key).await
    }

    /// Range reads bypass the store directly (no uncommitted overlay): no
    /// algorithm in this crate ranges over keys it has itself just written
    /// within the same transaction.
    pub async fn range(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        self.store.range(prefix).await
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.writes.insert(key.into(), Some(value));
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.writes.insert(key.into(), None);
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.store.commit(&self.read_versions, &self.writes).await
    }
}

/// Retries `body` up to `max_retries` additional times on `ConflictRetry`
/// before surfacing it to the caller.
pub const DEFAULT_MAX_RETRIES: usize = 5;

pub async fn transact_retry<T, F, Fut>(max_retries: usize, mut body: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match body().await {
            Err(StoreError::ConflictRetry) if attempt < max_retries => {
                attempt += 1;
                continue;
            }
            other => return other,
        }
    }
}
