//! Roomhub Storage Library
//!
//! Server side of the media pipeline: turning a storage key into a URL a
//! client can fetch without further authentication.
//!
//! - [`UrlSigner`] is the seam to the cloud-storage capability (S3 presigning
//!   or HMAC-signed local URLs).
//! - [`SignedUrlCache`] amortizes signing calls by reusing a signed URL until
//!   it gets close to expiry.
//!
//! # Storage key format
//!
//! Keys must not contain `..` or a leading `/`. Validation is centralized in
//! the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signed_url;
pub mod traits;

// Re-export commonly used types
pub use factory::create_signer;
#[cfg(feature = "storage-local")]
pub use local::LocalSigner;
pub use roomhub_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Signer;
pub use signed_url::{SignedUrlCache, SignedUrlEntry};
pub use traits::{StorageError, StorageResult, UrlSigner};
