//! Integration tests for the key/value store backends
//!
//! The same scenarios run against every backend. Redis tests only run when
//! `REDIS_URL` is set, e.g.:
//! - `REDIS_URL=redis://localhost:6379 cargo test --test storage_integration_test`
//!
//! Each Redis test uses its own key prefix so runs do not interfere.

use clickvault::registry::{RegistryConfig, UrlRegistry};
use clickvault::storage::{MemoryStorage, RedisStorage, Storage};
use std::sync::Arc;

/// Helper to create Redis test storage under a unique namespace
async fn create_redis_storage() -> Option<Arc<dyn Storage>> {
    let url = std::env::var("REDIS_URL").ok()?;
    let prefix = format!("clickvault-test:{}:", rand::random::<u64>());
    let storage = RedisStorage::new(&url, &prefix).ok()?;
    storage.ping().await.ok()?;
    Some(Arc::new(storage))
}

fn create_memory_storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

async fn check_primitives(storage: Arc<dyn Storage>) {
    let mut conn = storage.connect().await.unwrap();

    conn.set_with_ttl("url:k", "https://example.com", 60)
        .await
        .unwrap();
    assert_eq!(
        conn.get("url:k").await.unwrap().as_deref(),
        Some("https://example.com")
    );

    // Non-positive TTL behaves as immediate expiry rather than an error
    conn.set_with_ttl("url:k", "https://example.com", 0)
        .await
        .unwrap();
    assert_eq!(conn.get("url:k").await.unwrap(), None);

    assert_eq!(conn.increment("clicks:k").await.unwrap(), 1);
    assert_eq!(conn.increment("clicks:k").await.unwrap(), 2);

    for i in 0..5 {
        conn.list_push_front("clicks_log:k", &i.to_string())
            .await
            .unwrap();
    }
    conn.list_trim("clicks_log:k", 0, 2).await.unwrap();
    assert_eq!(
        conn.list_range("clicks_log:k", 0, -1).await.unwrap(),
        vec!["4", "3", "2"]
    );

    conn.set_with_ttl("url:a", "1", 60).await.unwrap();
    conn.set_with_ttl("url:b", "2", 60).await.unwrap();
    let mut keys = conn.keys_with_prefix("url:").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["url:a", "url:b"]);

    for key in ["url:a", "url:b", "clicks:k", "clicks_log:k", "missing"] {
        conn.delete(key).await.unwrap();
    }
    assert!(conn.keys_with_prefix("").await.unwrap().is_empty());
}

async fn check_registry_lifecycle(storage: Arc<dyn Storage>) {
    let registry = UrlRegistry::new(storage, RegistryConfig::default());

    let link = registry
        .create("https://example.com/lifecycle", None, None)
        .await
        .unwrap();
    for _ in 0..3 {
        assert_eq!(
            registry.resolve(&link.code).await.unwrap().as_deref(),
            Some("https://example.com/lifecycle")
        );
    }

    let stats = registry.get_stats(&link.code).await.unwrap().unwrap();
    assert_eq!(stats.click_count, 3);
    assert_eq!(stats.click_log.len(), 3);

    let listed = registry.list_all().await.unwrap();
    assert!(listed.iter().any(|l| l.code == link.code));

    assert!(registry.delete(&link.code).await.unwrap());
    assert_eq!(registry.resolve(&link.code).await.unwrap(), None);
    assert!(registry.get_stats(&link.code).await.unwrap().is_none());
}

#[tokio::test]
async fn test_primitives_memory() {
    check_primitives(create_memory_storage()).await;
}

#[tokio::test]
async fn test_primitives_redis() {
    let Some(storage) = create_redis_storage().await else {
        return;
    };
    check_primitives(storage).await;
}

#[tokio::test]
async fn test_registry_lifecycle_memory() {
    check_registry_lifecycle(create_memory_storage()).await;
}

#[tokio::test]
async fn test_registry_lifecycle_redis() {
    let Some(storage) = create_redis_storage().await else {
        return;
    };
    check_registry_lifecycle(storage).await;
}
