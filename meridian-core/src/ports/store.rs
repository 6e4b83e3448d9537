// meridian-core/src/ports/store.rs
//
// The key-value store contract. Two concrete adapters live under
// `infrastructure::store`: an in-memory store and a single-writer file store.
// The core never depends on driver specifics, only on this trait plus the
// optimistic-concurrency `Txn` wrapper in `domain::store::txn`.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum StoreError {
    #[error("optimistic transaction conflict, retry")]
    #[diagnostic(code(meridian::store::conflict_retry))]
    ConflictRetry,

    #[error("store call cancelled (deadline exceeded)")]
    #[diagnostic(code(meridian::store::cancelled))]
    Cancelled,

    #[error("store unavailable: {0}")]
    #[diagnostic(code(meridian::store::unavailable))]
    StoreUnavailable(String),

    #[error("store io error: {0}")]
    #[diagnostic(code(meridian::store::io))]
    Io(String),
}

/// Raw byte-oriented key-value contract. `range` returns entries in key order.
/// `version_of`/`commit` back the optimistic transaction wrapper in
/// `domain::store::txn::Txn` — no caller is expected to call them directly.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn range(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Monotonic version of `key` (0 if absent), bumped on every write.
    async fn version_of(&self, key: &str) -> Result<u64, StoreError>;

    /// Atomically applies `writes` (`None` = delete) iff every key in
    /// `read_versions` still matches the version recorded there; otherwise
    /// returns `StoreError::ConflictRetry` and applies nothing.
    async fn commit(
        &self,
        read_versions: &std::collections::HashMap<String, u64>,
        writes: &std::collections::HashMap<String, Option<Vec<u8>>>,
    ) -> Result<(), StoreError>;
}
