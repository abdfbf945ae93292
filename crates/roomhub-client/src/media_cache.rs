//! Media fetch cache
//!
//! Turns a remote (possibly authenticated) media URL into a `data:` URL that
//! needs no further network access, and keeps it in the media cache for a
//! TTL. Every write to the cache goes through the [`SerializedFetchQueue`]
//! lane: fetch-and-store units, sweeps and invalidations never overlap.
//!
//! Cache value format (JSON, keyed by the original URL):
//!
//! ```json
//! { "base64DataUrl": "data:image/png;base64,...", "expiration": 1767225600000 }
//! ```
//!
//! `expiration` is epoch milliseconds. Expired or unparseable values are
//! treated as misses and removed by the next sweep.

use crate::cache::{CacheError, CacheStorage, NamedCache};
use crate::fetcher::{
    FetchError, HttpFetcher, MediaFetcher, StaticTokenProvider, TokenProvider,
};
use crate::queue::{QueueError, SerializedFetchQueue};
use roomhub_core::{AppError, Clock, Config};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PASSTHROUGH_SCHEMES: [&str; 2] = ["blob:", "data:"];

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Media cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Failed to encode cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Fetch(FetchError::MissingToken) => {
                AppError::Unauthorized(FetchError::MissingToken.to_string())
            }
            MediaError::Fetch(e) => AppError::Fetch(e.to_string()),
            MediaError::Cache(e) => AppError::Storage(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Stored form of a cached media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMedia {
    pub base64_data_url: String,
    /// Epoch milliseconds.
    pub expiration: i64,
}

impl CachedMedia {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis > self.expiration
    }

    /// `None` for anything that is not a well-formed entry.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// `blob:` and `data:` URLs are already displayable.
pub fn is_passthrough_url(url: &str) -> bool {
    PASSTHROUGH_SCHEMES
        .iter()
        .any(|scheme| {
            url.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        })
}

struct Inner {
    cache: Arc<dyn NamedCache>,
    fetcher: Arc<dyn MediaFetcher>,
    tokens: Arc<dyn TokenProvider>,
    clock: Arc<dyn Clock>,
    queue: SerializedFetchQueue,
    ttl_millis: i64,
    sweep_pending: AtomicBool,
}

/// Cheap to clone; clones share the cache, the lane and the sweep state.
#[derive(Clone)]
pub struct MediaFetchCache {
    inner: Arc<Inner>,
}

impl MediaFetchCache {
    pub fn new(
        cache: Arc<dyn NamedCache>,
        fetcher: Arc<dyn MediaFetcher>,
        tokens: Arc<dyn TokenProvider>,
        clock: Arc<dyn Clock>,
        queue: SerializedFetchQueue,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                tokens,
                clock,
                queue,
                ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
                sweep_pending: AtomicBool::new(false),
            }),
        }
    }

    /// Wire up the HTTP fetcher, static token and a fresh lane from `config`.
    pub async fn from_config(
        config: &Config,
        storage: &dyn CacheStorage,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MediaError> {
        let cache = storage.open(&config.media_cache_name).await?;
        let fetcher = HttpFetcher::from_config(config)?;
        let tokens = StaticTokenProvider::new(config.media_auth_token.clone());

        tracing::info!(
            cache = %config.media_cache_name,
            backend = %storage.backend_type(),
            ttl_secs = config.media_cache_ttl.as_secs(),
            "Media cache initialized"
        );

        Ok(Self::new(
            cache,
            Arc::new(fetcher),
            Arc::new(tokens),
            clock,
            SerializedFetchQueue::new(),
            config.media_cache_ttl,
        ))
    }

    /// Resolve `url` to a `data:` URL.
    ///
    /// A live cache entry is returned at once and kicks off a background
    /// sweep of the whole cache. A miss is fetched on the serialized lane
    /// and stored for the configured TTL. Failures are never cached.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_as_data_url(&self, url: &str, require_auth: bool) -> Result<String, MediaError> {
        if is_passthrough_url(url) {
            return Ok(url.to_string());
        }

        if let Some(hit) = self.inner.lookup(url).await? {
            tracing::debug!("Media cache hit");
            self.schedule_sweep();
            return Ok(hit.base64_data_url);
        }

        let inner = self.inner.clone();
        let url = url.to_string();
        self.inner
            .queue
            .enqueue(async move { inner.fetch_and_store(&url, require_auth).await })
            .await?
    }

    /// Remove every entry that has expired or does not parse. Returns the
    /// number of entries removed.
    pub async fn sweep_expired(&self) -> Result<usize, MediaError> {
        let inner = self.inner.clone();
        self.inner
            .queue
            .enqueue(async move { inner.sweep().await })
            .await?
    }

    /// Drop cached representations of resources that were replaced, e.g.
    /// every size of a re-uploaded photo. Runs as one unit on the lane.
    pub async fn invalidate<I, S>(&self, urls: I) -> Result<usize, MediaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        let inner = self.inner.clone();
        self.inner
            .queue
            .enqueue(async move {
                let mut removed: usize = 0;
                for url in &urls {
                    if inner.cache.delete(url).await? {
                        removed += 1;
                    }
                }
                tracing::info!(requested = urls.len(), removed, "Media cache invalidated");
                Ok::<_, MediaError>(removed)
            })
            .await?
    }

    /// Queue a sweep unless one is already waiting on the lane.
    fn schedule_sweep(&self) {
        if self.inner.sweep_pending.swap(true, Ordering::AcqRel) {
            return;
        }

        let inner = self.inner.clone();
        // The unit runs whether or not anyone awaits it.
        drop(self.inner.queue.enqueue(async move {
            inner.sweep_pending.store(false, Ordering::Release);
            if let Err(e) = inner.sweep().await {
                tracing::warn!(error = %e, "Background media cache sweep failed");
            }
        }));
    }
}

impl Inner {
    async fn lookup(&self, url: &str) -> Result<Option<CachedMedia>, MediaError> {
        let Some(raw) = self.cache.get(url).await? else {
            return Ok(None);
        };

        match CachedMedia::parse(&raw) {
            Some(entry) if !entry.is_expired(self.clock.now_millis()) => Ok(Some(entry)),
            Some(_) => {
                tracing::debug!(url = %url, "Media cache entry expired");
                Ok(None)
            }
            None => {
                tracing::debug!(url = %url, "Media cache entry unreadable; treating as miss");
                Ok(None)
            }
        }
    }

    async fn fetch_and_store(&self, url: &str, require_auth: bool) -> Result<String, MediaError> {
        // An earlier unit on the lane may have fetched this URL already.
        if let Some(hit) = self.lookup(url).await? {
            return Ok(hit.base64_data_url);
        }

        let token = if require_auth {
            Some(
                self.tokens
                    .bearer_token()
                    .await?
                    .ok_or(FetchError::MissingToken)?,
            )
        } else {
            None
        };

        let media = self.fetcher.fetch(url, token.as_deref()).await?;
        let data_url = media.into_data_url()?;

        let entry = CachedMedia {
            base64_data_url: data_url,
            expiration: self.clock.now_millis().saturating_add(self.ttl_millis),
        };
        self.cache.put(url, serde_json::to_string(&entry)?).await?;

        tracing::debug!(url = %url, expiration = entry.expiration, "Media cached");
        Ok(entry.base64_data_url)
    }

    async fn sweep(&self) -> Result<usize, MediaError> {
        let mut removed: usize = 0;
        for key in self.cache.keys().await? {
            // Re-read: the listing may be stale by the time we get here.
            let Some(raw) = self.cache.get(&key).await? else {
                continue;
            };
            let stale = match CachedMedia::parse(&raw) {
                Some(entry) => entry.is_expired(self.clock.now_millis()),
                None => true,
            };
            if stale && self.cache.delete(&key).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "Media cache sweep removed entries");
        }
        Ok(removed)
    }
}
