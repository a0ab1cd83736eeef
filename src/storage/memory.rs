use crate::storage::{Storage, StorageConnection, StorageError, StorageResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Deadline after which the entry is treated as absent
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process key/value store with Redis-like semantics.
///
/// Expired entries are evicted lazily on access. Clones share the same data,
/// so every connection handed out by [`MemoryStorage::connect`] sees the same
/// keyspace.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<DashMap<String, Entry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn connect(&self) -> StorageResult<Box<dyn StorageConnection>> {
        Ok(Box::new(MemoryConnection {
            data: Arc::clone(&self.data),
        }))
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

pub struct MemoryConnection {
    data: Arc<DashMap<String, Entry>>,
}

impl MemoryConnection {
    /// Fetch a live entry, evicting it if its deadline has passed
    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.data.get(key).map(|e| e.value().clone())?;
        if entry.is_expired(now) {
            self.data.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry)
    }
}

fn wrong_type(key: &str) -> StorageError {
    StorageError::Command(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

/// Resolve inclusive, possibly negative, list indices against `len`
fn normalize_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if start > end || start >= len {
        return None;
    }

    Some((start as usize, end as usize))
}

#[async_trait]
impl StorageConnection for MemoryConnection {
    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl_secs: i64) -> StorageResult<()> {
        if ttl_secs <= 0 {
            self.data.remove(key);
            return Ok(());
        }

        let expires_at = Instant::now() + Duration::from_secs(ttl_secs as u64);
        self.data.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&mut self, key: &str) -> StorageResult<Option<String>> {
        match self.live(key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn increment(&mut self, key: &str) -> StorageResult<i64> {
        let now = Instant::now();
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(Value::Str("0".to_string())));

        if entry.is_expired(now) {
            *entry = Entry::persistent(Value::Str("0".to_string()));
        }

        match &mut entry.value {
            Value::Str(current) => {
                let next = current
                    .parse::<i64>()
                    .map_err(|_| {
                        StorageError::Command(format!("value at '{key}' is not an integer"))
                    })?
                    .checked_add(1)
                    .ok_or_else(|| {
                        StorageError::Command(format!("increment of '{key}' would overflow"))
                    })?;
                *current = next.to_string();
                Ok(next)
            }
            Value::List(_) => Err(wrong_type(key)),
        }
    }

    async fn list_push_front(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let now = Instant::now();
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(Value::List(VecDeque::new())));

        if entry.is_expired(now) {
            *entry = Entry::persistent(Value::List(VecDeque::new()));
        }

        match &mut entry.value {
            Value::List(items) => {
                items.push_front(value.to_string());
                Ok(())
            }
            Value::Str(_) => Err(wrong_type(key)),
        }
    }

    async fn list_trim(&mut self, key: &str, start: isize, end: isize) -> StorageResult<()> {
        let now = Instant::now();
        {
            let Some(mut entry) = self.data.get_mut(key) else {
                return Ok(());
            };
            if !entry.is_expired(now) {
                let Value::List(items) = &mut entry.value else {
                    return Err(wrong_type(key));
                };
                match normalize_range(items.len(), start, end) {
                    Some((from, to)) => {
                        items.truncate(to + 1);
                        items.drain(..from);
                    }
                    None => items.clear(),
                }
            }
        }

        // Empty lists no longer exist
        self.data.remove_if(key, |_, e| {
            e.is_expired(now) || matches!(&e.value, Value::List(items) if items.is_empty())
        });

        Ok(())
    }

    async fn list_range(
        &mut self,
        key: &str,
        start: isize,
        end: isize,
    ) -> StorageResult<Vec<String>> {
        let Some(entry) = self.live(key) else {
            return Ok(Vec::new());
        };
        let Value::List(items) = entry.value else {
            return Err(wrong_type(key));
        };

        Ok(match normalize_range(items.len(), start, end) {
            Some((from, to)) => items.into_iter().skip(from).take(to - from + 1).collect(),
            None => Vec::new(),
        })
    }

    async fn delete(&mut self, key: &str) -> StorageResult<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&mut self, prefix: &str) -> StorageResult<Vec<String>> {
        let now = Instant::now();
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn conn() -> Box<dyn StorageConnection> {
        MemoryStorage::new().connect().await.unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let mut conn = conn().await;
        conn.set_with_ttl("k", "v", 60).await.unwrap();
        assert_eq!(conn.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(conn.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let mut conn = conn().await;
        conn.set_with_ttl("k", "v", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(conn.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(conn.get("k").await.unwrap(), None);
        assert!(conn.keys_with_prefix("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_ttl_removes_key() {
        let mut conn = conn().await;
        conn.set_with_ttl("k", "v", 60).await.unwrap();
        conn.set_with_ttl("k", "other", 0).await.unwrap();
        assert_eq!(conn.get("k").await.unwrap(), None);

        conn.set_with_ttl("n", "v", -5).await.unwrap();
        assert_eq!(conn.get("n").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_creates_and_counts() {
        let mut conn = conn().await;
        assert_eq!(conn.increment("c").await.unwrap(), 1);
        assert_eq!(conn.increment("c").await.unwrap(), 2);
        assert_eq!(conn.get("c").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_increment_overflow_is_an_error() {
        let mut conn = conn().await;
        conn.set_with_ttl("c", &i64::MAX.to_string(), 60).await.unwrap();
        assert!(matches!(
            conn.increment("c").await,
            Err(StorageError::Command(_))
        ));
        assert_eq!(conn.get("c").await.unwrap(), Some(i64::MAX.to_string()));
    }

    #[tokio::test]
    async fn test_increment_rejects_non_integer() {
        let mut conn = conn().await;
        conn.set_with_ttl("c", "abc", 60).await.unwrap();
        assert!(matches!(
            conn.increment("c").await,
            Err(StorageError::Command(_))
        ));
    }

    #[tokio::test]
    async fn test_list_push_trim_range() {
        let mut conn = conn().await;
        for i in 0..5 {
            conn.list_push_front("l", &i.to_string()).await.unwrap();
        }

        assert_eq!(
            conn.list_range("l", 0, -1).await.unwrap(),
            vec!["4", "3", "2", "1", "0"]
        );
        assert_eq!(conn.list_range("l", 1, 2).await.unwrap(), vec!["3", "2"]);
        assert_eq!(conn.list_range("l", -2, -1).await.unwrap(), vec!["1", "0"]);
        assert!(conn.list_range("l", 7, 9).await.unwrap().is_empty());

        conn.list_trim("l", 0, 2).await.unwrap();
        assert_eq!(
            conn.list_range("l", 0, -1).await.unwrap(),
            vec!["4", "3", "2"]
        );

        conn.list_trim("l", 5, 10).await.unwrap();
        assert!(conn.list_range("l", 0, -1).await.unwrap().is_empty());
        assert!(conn.keys_with_prefix("l").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_type_errors() {
        let mut conn = conn().await;
        conn.list_push_front("l", "x").await.unwrap();
        assert!(conn.get("l").await.is_err());

        conn.set_with_ttl("s", "x", 60).await.unwrap();
        assert!(conn.list_push_front("s", "y").await.is_err());
        assert!(conn.list_range("s", 0, -1).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_prefix_scan() {
        let mut conn = conn().await;
        conn.set_with_ttl("url:a", "1", 60).await.unwrap();
        conn.set_with_ttl("url:b", "2", 60).await.unwrap();
        conn.set_with_ttl("meta:a", "3", 60).await.unwrap();

        let mut keys = conn.keys_with_prefix("url:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["url:a", "url:b"]);

        conn.delete("url:a").await.unwrap();
        conn.delete("url:never").await.unwrap();
        assert_eq!(conn.keys_with_prefix("url:").await.unwrap(), vec!["url:b"]);
    }

    #[tokio::test]
    async fn test_connections_share_keyspace() {
        let storage = MemoryStorage::new();
        let mut first = storage.connect().await.unwrap();
        let mut second = storage.connect().await.unwrap();

        first.set_with_ttl("shared", "yes", 60).await.unwrap();
        assert_eq!(second.get("shared").await.unwrap(), Some("yes".to_string()));
    }
}
