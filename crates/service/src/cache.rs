//! Read-through response cache for catalog and request listings.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::ServiceError;

/// `"{route}:{sha256 of the params as sorted JSON}"`.
pub fn cache_key(route: &str, params: &BTreeMap<String, String>) -> String {
    let encoded = serde_json::to_string(params).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    format!("{route}:{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, Value>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self { inner: Cache::builder().time_to_live(ttl).max_capacity(max_capacity).build() }
    }

    pub fn from_config(cfg: &configs::CacheConfig) -> Self {
        Self::new(Duration::from_secs(cfg.ttl_secs), cfg.max_capacity)
    }

    pub async fn get(&self, key: &str) -> Option<Value> { self.inner.get(key).await }

    pub async fn insert(&self, key: String, value: Value) { self.inner.insert(key, value).await; }

    /// Return the cached value for `key`, or run `load`, store and return its result.
    /// Failed loads are not cached.
    pub async fn get_or_try_insert_with<T, F, Fut>(&self, key: String, load: F) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if let Some(hit) = self.get(&key).await {
            match serde_json::from_value(hit) {
                Ok(v) => {
                    debug!(%key, "cache hit");
                    return Ok(v);
                }
                Err(e) => debug!(%key, error = %e, "discarding unreadable cache entry"),
            }
        }
        debug!(%key, "cache miss");
        let fresh = load().await?;
        let stored = serde_json::to_value(&fresh).map_err(|e| ServiceError::Db(format!("cache encode: {e}")))?;
        self.insert(key, stored).await;
        Ok(fresh)
    }

    /// Drop every entry; called after catalog writes and request mutations.
    pub fn invalidate_all(&self) { self.inner.invalidate_all(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn key_ignores_parameter_order() {
        let a = cache_key("/services", &params(&[("search", "paint"), ("pin_code", "560001")]));
        let b = cache_key("/services", &params(&[("pin_code", "560001"), ("search", "paint")]));
        assert_eq!(a, b);
        assert!(a.starts_with("/services:"));
        assert_eq!(a.len(), "/services:".len() + 64);
        assert_ne!(a, cache_key("/requests", &params(&[("search", "paint"), ("pin_code", "560001")])));
    }

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let calls = AtomicUsize::new(0);
        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ServiceError>(vec![1, 2, 3])
        };

        let first: Vec<i32> = cache.get_or_try_insert_with("k".into(), load).await.unwrap();
        let second: Vec<i32> = cache.get_or_try_insert_with("k".into(), load).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate_all();
        let _: Vec<i32> = cache.get_or_try_insert_with("k".into(), load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let failed: Result<Vec<i32>, _> = cache
            .get_or_try_insert_with("k".into(), || async { Err(ServiceError::Db("down".into())) })
            .await;
        assert!(failed.is_err());
        assert!(cache.get("k").await.is_none());
    }
}
