//! Draft persistence
//!
//! Drafts live in their own cache namespace under keys `draft-<N>`. The
//! reserved key `last-id` holds the highest committed `N` as a bare JSON
//! number. Allocation is two-step: [`DraftStore::create_new_cache_url`]
//! proposes the next key without writing anything, and
//! [`DraftStore::put_last_cache_url`] commits the counter once the draft
//! itself has been stored.
//!
//! Within one process [`DraftStore::save_new_draft`] serializes allocation
//! and skips keys that are already taken. Across processes sharing a
//! filesystem cache there is no lock; the taken-key check narrows the
//! window but does not close it.

use crate::cache::{CacheError, CacheStorage, NamedCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const LAST_ID_KEY: &str = "last-id";
pub const DRAFT_KEY_PREFIX: &str = "draft-";

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Invalid draft key: {0}")]
    InvalidDraftKey(String),

    #[error("Draft cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn draft_key(id: u64) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, id)
}

/// Trailing integer of a draft key: `draft-12` → 12.
pub fn parse_draft_id(key: &str) -> Result<u64, DraftError> {
    let prefix = key.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &key[prefix.len()..];
    if digits.is_empty() {
        return Err(DraftError::InvalidDraftKey(key.to_string()));
    }
    digits
        .parse::<u64>()
        .map_err(|_| DraftError::InvalidDraftKey(key.to_string()))
}

pub struct DraftStore {
    cache: Arc<dyn NamedCache>,
    allocation: Mutex<()>,
}

impl DraftStore {
    pub fn new(cache: Arc<dyn NamedCache>) -> Self {
        Self {
            cache,
            allocation: Mutex::new(()),
        }
    }

    pub async fn open(storage: &dyn CacheStorage, cache_name: &str) -> Result<Self, DraftError> {
        Ok(Self::new(storage.open(cache_name).await?))
    }

    pub fn cache_name(&self) -> &str {
        self.cache.name()
    }

    /// Committed counter. Absent means 0. An unreadable value falls back to
    /// the highest existing draft number so allocation never goes backwards.
    async fn last_id(&self) -> Result<u64, DraftError> {
        let Some(raw) = self.cache.get(LAST_ID_KEY).await? else {
            return Ok(0);
        };
        match serde_json::from_str::<u64>(raw.trim()) {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(
                    cache = %self.cache.name(),
                    value = %raw,
                    error = %e,
                    "Unreadable draft counter; recovering from existing keys"
                );
                Ok(self.draft_ids().await?.into_iter().max().unwrap_or(0))
            }
        }
    }

    async fn draft_ids(&self) -> Result<Vec<u64>, DraftError> {
        Ok(self
            .cache
            .keys()
            .await?
            .iter()
            .filter_map(|key| parse_draft_id(key).ok().filter(|id| *key == draft_key(*id)))
            .collect())
    }

    /// Next draft key, `draft-<last-id + 1>`. Nothing is written.
    pub async fn create_new_cache_url(&self) -> Result<String, DraftError> {
        Ok(draft_key(self.last_id().await? + 1))
    }

    /// Commit the counter to the number in `draft_key`. Call after the draft
    /// has been written. The counter only moves forward; returns its value.
    pub async fn put_last_cache_url(&self, draft_key: &str) -> Result<u64, DraftError> {
        let id = parse_draft_id(draft_key)?;
        let current = self.last_id().await?;
        if id <= current {
            tracing::debug!(key = %draft_key, last_id = current, "Draft counter already ahead");
            return Ok(current);
        }

        self.cache
            .put(LAST_ID_KEY, serde_json::to_string(&id)?)
            .await?;
        Ok(id)
    }

    /// Every key in the namespace, `last-id` included.
    pub async fn get_all_cache_urls(&self) -> Result<Vec<String>, DraftError> {
        Ok(self.cache.keys().await?)
    }

    /// Draft keys only, in allocation order.
    pub async fn list_drafts(&self) -> Result<Vec<String>, DraftError> {
        let mut ids = self.draft_ids().await?;
        ids.sort_unstable();
        Ok(ids.into_iter().map(draft_key).collect())
    }

    pub async fn save_draft<T: Serialize + ?Sized>(
        &self,
        draft_key: &str,
        snapshot: &T,
    ) -> Result<(), DraftError> {
        // Only `draft-<id>` keys are listed, so nothing else may be saved.
        let id = parse_draft_id(draft_key)?;
        if draft_key != self::draft_key(id) {
            return Err(DraftError::InvalidDraftKey(draft_key.to_string()));
        }

        self.cache
            .put(draft_key, serde_json::to_string(snapshot)?)
            .await?;
        tracing::debug!(cache = %self.cache.name(), key = %draft_key, "Draft saved");
        Ok(())
    }

    pub async fn load_draft<T: DeserializeOwned>(&self, draft_key: &str) -> Result<Option<T>, DraftError> {
        match self.cache.get(draft_key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Remove a draft after submit or discard. The counter is left alone so
    /// the number is never handed out again.
    pub async fn delete_draft(&self, draft_key: &str) -> Result<bool, DraftError> {
        Ok(self.cache.delete(draft_key).await?)
    }

    /// Allocate a key, write `snapshot` under it, then commit the counter.
    /// Keys already present (written by another process) are skipped.
    pub async fn save_new_draft<T: Serialize + ?Sized>(&self, snapshot: &T) -> Result<String, DraftError> {
        let _guard = self.allocation.lock().await;

        loop {
            let key = self.create_new_cache_url().await?;
            if self.cache.get(&key).await?.is_some() {
                tracing::warn!(cache = %self.cache.name(), key = %key, "Draft key already taken; advancing counter");
                self.put_last_cache_url(&key).await?;
                continue;
            }

            self.save_draft(&key, snapshot).await?;
            self.put_last_cache_url(&key).await?;
            return Ok(key);
        }
    }
}
