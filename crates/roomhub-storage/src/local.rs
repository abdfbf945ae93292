//! HMAC-signed expiring URLs for the local storage backend.
//!
//! URL: `{base_url}/{key}?expires={unix_secs}&signature={hex}` where
//! signature = HMAC-SHA256(secret, "GET\n{key}\n{unix_secs}"). The file
//! server calls [`LocalSigner::verify`] before serving.

use crate::keys::validate_storage_key;
use crate::traits::{StorageError, StorageResult, UrlSigner};
use crate::StorageBackend;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use roomhub_core::Clock;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Local filesystem signing backend
#[derive(Clone)]
pub struct LocalSigner {
    base_url: String,
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl LocalSigner {
    /// Create a new LocalSigner instance
    ///
    /// # Arguments
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    /// * `secret` - HMAC key shared with the file server
    pub fn new(
        base_url: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(StorageError::ConfigError(
                "Local signing secret must not be empty".to_string(),
            ));
        }
        Ok(LocalSigner {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
            clock,
        })
    }

    fn mac(&self, storage_key: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        mac.update(b"GET\n");
        mac.update(storage_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn encode_key(storage_key: &str) -> String {
        storage_key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check a signature produced by [`UrlSigner::get_presigned_url`].
    pub fn verify(&self, storage_key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        let tag = hex::decode(signature)
            .map_err(|_| StorageError::SigningFailed("Malformed signature".to_string()))?;
        self.mac(storage_key, expires)?
            .verify_slice(&tag)
            .map_err(|_| StorageError::SigningFailed("Signature mismatch".to_string()))?;

        if self.clock.now().timestamp() > expires {
            return Err(StorageError::SigningFailed(
                "Signed URL has expired".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UrlSigner for LocalSigner {
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_storage_key(storage_key)?;

        let expires = self.clock.now().timestamp() + expires_in.as_secs() as i64;
        let signature = hex::encode(self.mac(storage_key, expires)?.finalize().into_bytes());

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            Self::encode_key(storage_key),
            expires,
            signature
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use roomhub_core::ManualClock;

    fn signer(clock: &ManualClock) -> LocalSigner {
        LocalSigner::new(
            "http://localhost:3000/media/",
            b"test-secret".to_vec(),
            Arc::new(clock.clone()),
        )
        .unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[tokio::test]
    async fn signed_url_verifies_until_expiry() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        let signer = signer(&clock);

        let url = signer
            .get_presigned_url("rooms/7/cover photo.jpg", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/media/rooms/7/cover%20photo.jpg?"));

        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");
        assert_eq!(expires, clock.now().timestamp() + 900);
        signer
            .verify("rooms/7/cover photo.jpg", expires, signature)
            .unwrap();

        clock.advance(ChronoDuration::seconds(901));
        assert!(signer
            .verify("rooms/7/cover photo.jpg", expires, signature)
            .is_err());
    }

    #[tokio::test]
    async fn tampered_key_is_rejected() {
        let clock = ManualClock::default();
        let signer = signer(&clock);
        let url = signer
            .get_presigned_url("rooms/7/a.jpg", Duration::from_secs(60))
            .await
            .unwrap();
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");

        assert!(signer.verify("rooms/8/a.jpg", expires, signature).is_err());
        assert!(signer.verify("rooms/7/a.jpg", expires + 1, signature).is_err());
        assert!(signer.verify("rooms/7/a.jpg", expires, "zz").is_err());
    }

    #[tokio::test]
    async fn invalid_key_is_not_signed() {
        let clock = ManualClock::default();
        let err = signer(&clock)
            .get_presigned_url("../etc/passwd", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn empty_secret_rejected() {
        let clock = ManualClock::default();
        assert!(LocalSigner::new("http://x", Vec::<u8>::new(), Arc::new(clock)).is_err());
    }
}
