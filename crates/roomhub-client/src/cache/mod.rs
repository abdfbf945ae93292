//! Named key/value caches
//!
//! A [`CacheStorage`] hands out independent [`NamedCache`] namespaces by
//! name ("media-cache", "drafts"). Values are opaque strings; callers store
//! JSON documents in them. Opening the same name twice yields the same data.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use roomhub_core::{CacheBackend, Config};
use std::sync::Arc;

pub use fs::{FsCache, FsCacheStorage};
pub use memory::{MemoryCache, MemoryCacheStorage};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache name: {0}")]
    InvalidName(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// One cache namespace.
#[async_trait]
pub trait NamedCache: Send + Sync {
    fn name(&self) -> &str;

    async fn keys(&self) -> CacheResult<Vec<String>>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Full overwrite of `key`.
    async fn put(&self, key: &str, value: String) -> CacheResult<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn NamedCache>>;

    fn backend_type(&self) -> CacheBackend;
}

pub(crate) fn validate_cache_name(name: &str) -> CacheResult<()> {
    if name.is_empty()
        || name.starts_with('.')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CacheError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Build the cache storage selected by `CACHE_BACKEND`.
pub fn create_cache_storage(config: &Config) -> Arc<dyn CacheStorage> {
    match config.cache_backend {
        CacheBackend::Memory => {
            tracing::debug!("Using in-memory cache storage");
            Arc::new(MemoryCacheStorage::new())
        }
        CacheBackend::Filesystem => {
            tracing::debug!(dir = %config.cache_dir.display(), "Using filesystem cache storage");
            Arc::new(FsCacheStorage::new(config.cache_dir.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_names_are_restricted() {
        assert!(validate_cache_name("media-cache").is_ok());
        assert!(validate_cache_name("drafts_v2").is_ok());
        assert!(validate_cache_name("").is_err());
        assert!(validate_cache_name("..").is_err());
        assert!(validate_cache_name("a/b").is_err());
    }

    #[tokio::test]
    async fn factory_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_backend: CacheBackend::Filesystem,
            cache_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let storage = create_cache_storage(&config);
        assert_eq!(storage.backend_type(), CacheBackend::Filesystem);

        let storage = create_cache_storage(&Config::default());
        assert_eq!(storage.backend_type(), CacheBackend::Memory);
    }
}
