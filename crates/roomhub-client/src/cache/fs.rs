//! Filesystem-backed cache namespaces.
//!
//! Layout: `{root}/{cache name}/{hex sha256 of key}`. File names have a
//! fixed length whatever the key, so presigned URLs of any size fit. Each
//! file holds `{"key": .., "value": ..}` so `keys()` can recover the
//! original key. Writes go to a sibling temp file first and are renamed
//! into place, so a reader never sees a half-written value.

use super::{validate_cache_name, CacheResult, CacheStorage, NamedCache};
use async_trait::async_trait;
use roomhub_core::CacheBackend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

// Hex digests never contain a dot.
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
}

#[derive(Clone)]
pub struct FsCache {
    name: String,
    dir: PathBuf,
}

impl FsCache {
    pub async fn open(root: impl Into<PathBuf>, name: &str) -> CacheResult<Self> {
        validate_cache_name(name)?;
        let dir = root.into().join(name);
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    /// `None` for a missing file; unreadable contents are logged and skipped.
    async fn read_entry(&self, path: &Path) -> CacheResult<Option<StoredEntry>> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<StoredEntry>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(cache = %self.name, file = %path.display(), error = %e, "Skipping unreadable cache file");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl NamedCache for FsCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_str()
                .map_or(true, |name| name.ends_with(TEMP_SUFFIX))
            {
                continue;
            }
            if let Some(stored) = self.read_entry(&entry.path()).await? {
                keys.push(stored.key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entry = self.read_entry(&self.key_to_path(key)).await?;
        Ok(entry.filter(|e| e.key == key).map(|e| e.value))
    }

    async fn put(&self, key: &str, value: String) -> CacheResult<()> {
        let path = self.key_to_path(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TEMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_vec(&StoredEntry {
            key: key.to_string(),
            value,
        })?;

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cache storage rooted at a directory; survives process restarts.
#[derive(Clone)]
pub struct FsCacheStorage {
    root: PathBuf,
}

impl FsCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CacheStorage for FsCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn NamedCache>> {
        Ok(Arc::new(FsCache::open(self.root.clone(), name).await?))
    }

    fn backend_type(&self) -> CacheBackend {
        CacheBackend::Filesystem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn url_keys_round_trip_through_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::open(dir.path(), "media-cache").await.unwrap();
        let url = "https://cdn.example/rooms/7/cover.jpg?size=small";

        cache.put(url, "{}".to_string()).await.unwrap();
        cache.put("draft-1", "[]".to_string()).await.unwrap();

        assert_eq!(
            cache.keys().await.unwrap(),
            vec!["draft-1".to_string(), url.to_string()]
        );
        assert_eq!(cache.get(url).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path());
        storage
            .open("drafts")
            .await
            .unwrap()
            .put("last-id", "3".to_string())
            .await
            .unwrap();

        let reopened = FsCacheStorage::new(dir.path()).open("drafts").await.unwrap();
        assert_eq!(reopened.get("last-id").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn long_presigned_url_is_a_valid_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::open(dir.path(), "media-cache").await.unwrap();
        let url = format!(
            "https://roomhub-media.s3.eu-west-1.amazonaws.com/rooms/7/cover.jpg\
             ?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential={}&X-Amz-Date=20260101T120000Z\
             &X-Amz-Expires=900&X-Amz-SignedHeaders=host&X-Amz-Signature={}",
            "AKIAEXAMPLE%2F20260101%2Feu-west-1%2Fs3%2Faws4_request".repeat(3),
            "ab".repeat(64)
        );
        assert!(url.len() > 300);

        cache.put(&url, "{}".to_string()).await.unwrap();

        assert_eq!(cache.get(&url).await.unwrap().as_deref(), Some("{}"));
        assert_eq!(cache.keys().await.unwrap(), vec![url.clone()]);
        assert!(cache.delete(&url).await.unwrap());
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_and_odd_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::open(dir.path(), "c").await.unwrap();
        assert_eq!(cache.get("nope").await.unwrap(), None);
        assert!(!cache.delete("nope").await.unwrap());

        for key in ["", "..", "a/b"] {
            cache.put(key, key.to_string()).await.unwrap();
            assert_eq!(cache.get(key).await.unwrap().as_deref(), Some(key));
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::open(dir.path(), "c").await.unwrap();
        cache.put("k", "v".to_string()).await.unwrap();
        std::fs::write(dir.path().join("c").join("garbage"), "not json").unwrap();

        assert_eq!(cache.keys().await.unwrap(), vec!["k".to_string()]);
    }
}
