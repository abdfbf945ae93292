//! Roomhub Client Library
//!
//! Client side of the media pipeline:
//!
//! - [`cache`]: named key/value namespaces (in-memory or on disk).
//! - [`MediaFetchCache`]: remote media URL → cached `data:` URL with a TTL,
//!   fetched one at a time through [`SerializedFetchQueue`].
//! - [`DraftStore`]: sequentially numbered drafts of in-progress forms.

pub mod cache;
pub mod drafts;
pub mod fetcher;
pub mod media_cache;
pub mod queue;

pub use cache::{
    create_cache_storage, CacheError, CacheResult, CacheStorage, FsCacheStorage,
    MemoryCacheStorage, NamedCache,
};
pub use drafts::{DraftError, DraftStore, LAST_ID_KEY};
pub use fetcher::{
    FetchError, FetchedMedia, HttpFetcher, MediaFetcher, StaticTokenProvider, TokenProvider,
};
pub use media_cache::{CachedMedia, MediaError, MediaFetchCache};
pub use queue::{QueueError, SerializedFetchQueue};
