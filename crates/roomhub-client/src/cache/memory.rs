use super::{validate_cache_name, CacheResult, CacheStorage, NamedCache};
use async_trait::async_trait;
use roomhub_core::CacheBackend;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Process-local cache namespace. Lost on exit.
pub struct MemoryCache {
    name: String,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl NamedCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> CacheResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<HashMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn NamedCache>> {
        validate_cache_name(name)?;
        let mut caches = self.caches.lock().await;
        let cache = caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::new(name)))
            .clone();
        Ok(cache)
    }

    fn backend_type(&self) -> CacheBackend {
        CacheBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn namespaces_are_shared_by_name_and_isolated_otherwise() {
        let storage = MemoryCacheStorage::new();
        let media = storage.open("media-cache").await.unwrap();
        let again = storage.open("media-cache").await.unwrap();
        let drafts = storage.open("drafts").await.unwrap();

        media.put("k", "v".to_string()).await.unwrap();

        assert_eq!(again.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(drafts.get("k").await.unwrap(), None);
        assert_eq!(media.name(), "media-cache");
    }

    #[tokio::test]
    async fn put_overwrites_and_delete_reports_presence() {
        let cache = MemoryCache::new("c");
        cache.put("k", "1".to_string()).await.unwrap();
        cache.put("k", "2".to_string()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.keys().await.unwrap(), vec!["k".to_string()]);

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert!(cache.keys().await.unwrap().is_empty());
    }
}
