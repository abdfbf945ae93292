#[cfg(feature = "storage-local")]
use crate::LocalSigner;
#[cfg(feature = "storage-s3")]
use crate::S3Signer;
use crate::{StorageBackend, StorageError, StorageResult, UrlSigner};
use roomhub_core::{Clock, Config};
use std::sync::Arc;

/// Create a signing backend based on configuration
pub fn create_signer(config: &Config, clock: Arc<dyn Clock>) -> StorageResult<Arc<dyn UrlSigner>> {
    let backend = config.storage_backend.unwrap_or(StorageBackend::S3);

    match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .or_else(|| config.aws_region.clone())
                .ok_or_else(|| {
                    StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
                })?;

            let signer = S3Signer::new(bucket, region, config.s3_endpoint.clone())?;
            Ok(Arc::new(signer))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;
            let secret = config.local_signing_secret.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_SIGNING_SECRET not configured".to_string())
            })?;

            let signer = LocalSigner::new(base_url, secret.into_bytes(), clock)?;
            Ok(Arc::new(signer))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
