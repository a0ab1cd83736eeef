use crate::storage::{Storage, StorageConnection, StorageError, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, trace};

/// Redis-backed store.
///
/// Holds only the client; a new multiplexed connection is opened for every
/// [`Storage::connect`] call and closed when the returned handle is dropped.
pub struct RedisStorage {
    client: redis::Client,
    /// Namespace prepended to every key, stripped again on enumeration
    key_prefix: String,
}

impl RedisStorage {
    pub fn new(redis_url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("invalid Redis URL: {redis_url}"))?;

        debug!("RedisStorage created with prefix: '{}'", key_prefix);

        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn open(&self) -> StorageResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn command_error(err: redis::RedisError) -> StorageError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StorageError::Connection(err.to_string())
    } else {
        StorageError::Command(err.to_string())
    }
}

/// Escape glob metacharacters so a prefix matches literally in `KEYS`
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Storage for RedisStorage {
    async fn connect(&self) -> StorageResult<Box<dyn StorageConnection>> {
        let conn = self.open().await?;
        trace!("Redis connection established");

        Ok(Box::new(RedisConnection {
            conn,
            key_prefix: self.key_prefix.clone(),
        }))
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.open().await?;
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        debug!("Redis connection test successful: {}", response);
        Ok(())
    }
}

pub struct RedisConnection {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisConnection {
    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl StorageConnection for RedisConnection {
    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl_secs: i64) -> StorageResult<()> {
        let redis_key = self.make_key(key);

        // SETEX rejects non-positive expiry; an already-expired entry is simply absent
        if ttl_secs <= 0 {
            let _: i64 = self.conn.del(&redis_key).await.map_err(command_error)?;
            return Ok(());
        }

        let _: () = self
            .conn
            .set_ex(&redis_key, value, ttl_secs as u64)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn get(&mut self, key: &str) -> StorageResult<Option<String>> {
        let redis_key = self.make_key(key);
        let value: Option<String> = self.conn.get(&redis_key).await.map_err(command_error)?;
        Ok(value)
    }

    async fn increment(&mut self, key: &str) -> StorageResult<i64> {
        let redis_key = self.make_key(key);
        let value: i64 = self.conn.incr(&redis_key, 1).await.map_err(command_error)?;
        Ok(value)
    }

    async fn list_push_front(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let redis_key = self.make_key(key);
        let _: i64 = self
            .conn
            .lpush(&redis_key, value)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn list_trim(&mut self, key: &str, start: isize, end: isize) -> StorageResult<()> {
        let redis_key = self.make_key(key);
        let _: () = self
            .conn
            .ltrim(&redis_key, start, end)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn list_range(
        &mut self,
        key: &str,
        start: isize,
        end: isize,
    ) -> StorageResult<Vec<String>> {
        let redis_key = self.make_key(key);
        let items: Vec<String> = self
            .conn
            .lrange(&redis_key, start, end)
            .await
            .map_err(command_error)?;
        Ok(items)
    }

    async fn delete(&mut self, key: &str) -> StorageResult<()> {
        let redis_key = self.make_key(key);
        let deleted: i64 = self.conn.del(&redis_key).await.map_err(command_error)?;
        if deleted == 0 {
            trace!("Key not found for removal: {}", key);
        }
        Ok(())
    }

    async fn keys_with_prefix(&mut self, prefix: &str) -> StorageResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.make_key(prefix)));
        let keys: Vec<String> = self.conn.keys(&pattern).await.map_err(command_error)?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.key_prefix.as_str()).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("url:"), "url:");
        assert_eq!(escape_glob("app*[1]?:"), "app\\*\\[1\\]\\?:");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisStorage::new("not a url", "").is_err());
    }
}
