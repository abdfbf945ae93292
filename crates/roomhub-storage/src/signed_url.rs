//! Signed-URL cache
//!
//! Signing is a network round trip to the storage provider, so a signed URL
//! is reused for every request of the same storage key until it is within
//! `access_margin` of expiring. The margin guarantees a consumer never gets a
//! URL that could lapse mid-download.
//!
//! One instance per server process. Nothing is shared or coordinated across
//! processes; two instances may hold different URLs for the same key.

use crate::traits::UrlSigner;
use chrono::{DateTime, Utc};
use roomhub_core::{AppError, Clock, Config};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cached signed URL with its expiry instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrlEntry {
    pub url: String,
    pub expires: DateTime<Utc>,
}

impl SignedUrlEntry {
    /// Reusable only while `now < expires - margin`.
    pub fn is_reusable(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now < self.expires - margin
    }
}

pub struct SignedUrlCache {
    signer: Arc<dyn UrlSigner>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    access_margin: chrono::Duration,
    entries: RwLock<HashMap<String, SignedUrlEntry>>,
}

impl SignedUrlCache {
    /// Create a cache issuing URLs valid for `ttl`, reused until `access_margin`
    /// before they expire.
    pub fn new(
        signer: Arc<dyn UrlSigner>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        access_margin: Duration,
    ) -> Self {
        Self {
            signer,
            clock,
            ttl,
            access_margin: chrono::Duration::from_std(access_margin)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(signer: Arc<dyn UrlSigner>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self::new(
            signer,
            clock,
            config.signed_url_ttl,
            config.signed_url_access_margin,
        )
    }

    /// Return a read URL for `path`, signing a fresh one only when the cached
    /// URL is missing or too close to expiry.
    ///
    /// Signing failures surface as [`AppError::Signing`] (HTTP 500) and are
    /// neither retried nor cached.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<String, AppError> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(path) {
                if entry.is_reusable(now, self.access_margin) {
                    tracing::debug!(expires = %entry.expires, "Signed URL cache hit");
                    return Ok(entry.url.clone());
                }
            }
        }

        let expires = now
            + chrono::Duration::from_std(self.ttl)
                .map_err(|e| AppError::Internal(format!("Invalid signed URL TTL: {}", e)))?;

        let url = self
            .signer
            .get_presigned_url(path, self.ttl)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    backend = %self.signer.backend_type(),
                    "Failed to sign read URL"
                );
                AppError::Signing(e.to_string())
            })?;

        self.entries.write().await.insert(
            path.to_string(),
            SignedUrlEntry {
                url: url.clone(),
                expires,
            },
        );

        tracing::debug!(expires = %expires, "Signed URL issued");
        Ok(url)
    }

    /// Drop the cached URL for `path`, e.g. after the object was replaced.
    pub async fn invalidate(&self, path: &str) -> bool {
        self.entries.write().await.remove(path).is_some()
    }

    /// Remove entries that can no longer be handed out. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_reusable(now, self.access_margin));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{StorageError, StorageResult};
    use crate::StorageBackend;
    use async_trait::async_trait;
    use roomhub_core::{ErrorMetadata, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSigner {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl UrlSigner for CountingSigner {
        async fn get_presigned_url(
            &self,
            storage_key: &str,
            expires_in: Duration,
        ) -> StorageResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(StorageError::SigningFailed("bucket unreachable".to_string()));
            }
            Ok(format!(
                "https://signed.example/{}?ttl={}&n={}",
                storage_key,
                expires_in.as_secs(),
                n
            ))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    fn cache(signer: Arc<CountingSigner>, clock: &ManualClock) -> SignedUrlCache {
        SignedUrlCache::new(
            signer,
            Arc::new(clock.clone()),
            Duration::from_secs(15 * 60),
            Duration::from_secs(2 * 60),
        )
    }

    #[tokio::test]
    async fn reuses_url_with_plenty_of_time_left() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner::default());
        let cache = cache(signer.clone(), &clock);

        let first = cache.get("rooms/1/cover.jpg").await.unwrap();
        assert!(first.contains("ttl=900"));

        // 10 minutes of validity left
        clock.advance(chrono::Duration::minutes(5));
        let second = cache.get("rooms/1/cover.jpg").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resigns_inside_access_margin() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner::default());
        let cache = cache(signer.clone(), &clock);

        let first = cache.get("rooms/1/cover.jpg").await.unwrap();

        // 60 seconds of validity left, less than the 2 minute margin
        clock.advance(chrono::Duration::minutes(14));
        let second = cache.get("rooms/1/cover.jpg").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn margin_boundary_is_exclusive() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner::default());
        let cache = cache(signer.clone(), &clock);

        cache.get("a").await.unwrap();
        // exactly expires - margin: no longer reusable
        clock.advance(chrono::Duration::minutes(13));
        cache.get("a").await.unwrap();
        assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn paths_are_cached_independently() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner::default());
        let cache = cache(signer.clone(), &clock);

        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();
        cache.get("a").await.unwrap();

        assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn signing_failure_is_500_and_not_cached() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner {
            fail: true,
            ..Default::default()
        });
        let cache = cache(signer.clone(), &clock);

        let err = cache.get("a").await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
        assert!(err.to_string().contains("bucket unreachable"));
        assert!(cache.is_empty().await);

        cache.get("a").await.unwrap_err();
        assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_and_purge() {
        let clock = ManualClock::default();
        let signer = Arc::new(CountingSigner::default());
        let cache = cache(signer.clone(), &clock);

        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();
        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);

        clock.advance(chrono::Duration::minutes(14));
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }
}
