//! URL signing abstraction
//!
//! This module defines the trait every signing backend implements. The
//! signed-URL cache works against it without knowing which provider issues
//! the URLs.

use crate::StorageBackend;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Issues time-limited, capability-bearing read URLs.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Generate a presigned GET URL valid for exactly `expires_in` from now.
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
