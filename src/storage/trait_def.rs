use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to acquire store connection: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Connection factory for a key/value store.
///
/// Every caller acquires its own connection and drops it when done; nothing
/// is shared between calls.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a fresh connection to the store
    async fn connect(&self) -> StorageResult<Box<dyn StorageConnection>>;

    /// Check that the store is reachable
    async fn ping(&self) -> StorageResult<()>;
}

/// The key/value operations the URL registry relies on.
///
/// List indices are inclusive and may be negative, counting from the tail
/// (`-1` is the last element), matching Redis `LRANGE`/`LTRIM`.
#[async_trait]
pub trait StorageConnection: Send {
    /// Overwrite `key` and expire it after `ttl_secs`.
    /// A non-positive TTL expires the key immediately.
    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl_secs: i64) -> StorageResult<()>;

    async fn get(&mut self, key: &str) -> StorageResult<Option<String>>;

    /// Atomically add one, creating the counter at 1 if absent
    async fn increment(&mut self, key: &str) -> StorageResult<i64>;

    async fn list_push_front(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Keep only the elements in `start..=end`
    async fn list_trim(&mut self, key: &str, start: isize, end: isize) -> StorageResult<()>;

    async fn list_range(
        &mut self,
        key: &str,
        start: isize,
        end: isize,
    ) -> StorageResult<Vec<String>>;

    /// Remove `key`; absent keys are not an error
    async fn delete(&mut self, key: &str) -> StorageResult<()>;

    /// Enumerate live keys starting with `prefix`
    async fn keys_with_prefix(&mut self, prefix: &str) -> StorageResult<Vec<String>>;
}
