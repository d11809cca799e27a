use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, warn};

/// In-memory TTL cache for GET responses, keyed by request path plus query
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Value>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { entries }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let hit = self.entries.get(key).await;
        if hit.is_some() {
            debug!("Cache hit for {}", key);
        }
        hit
    }

    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value).await;
    }

    /// Drop every entry for a resource path: the path itself, `path/...` and `path?...`
    pub fn invalidate_prefix(&self, prefix: &str) {
        let prefix = prefix.to_string();
        let result = self.entries.invalidate_entries_if(move |key, _| {
            key.strip_prefix(prefix.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
        });
        if let Err(e) = result {
            warn!("Cache invalidation failed, clearing everything: {}", e);
            self.entries.invalidate_all();
        }
    }

    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn prefix_invalidation_spares_other_resources() {
        let cache = ResponseCache::default();
        cache.insert("/next_api/orders?limit=5", json!([1])).await;
        cache.insert("/next_api/orders/3", json!({"id": 3})).await;
        cache.insert("/next_api/order_items?order_id=3", json!([])).await;

        cache.invalidate_prefix("/next_api/orders");

        assert!(cache.get("/next_api/orders?limit=5").await.is_none());
        assert!(cache.get("/next_api/orders/3").await.is_none());
        assert!(cache.get("/next_api/order_items?order_id=3").await.is_some());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(50));
        cache.insert("/next_api/products", json!([])).await;
        assert!(cache.get("/next_api/products").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("/next_api/products").await.is_none());
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = ResponseCache::default();
        cache.insert("/next_api/customers", json!([])).await;
        cache.clear().await;
        assert!(cache.get("/next_api/customers").await.is_none());
    }
}
