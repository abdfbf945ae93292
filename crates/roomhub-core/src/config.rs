//! Configuration module
//!
//! Knobs for the media pipeline: cache TTLs, signed-URL lifetimes, the named
//! cache backend on the client and the storage backend on the server.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::{CacheBackend, StorageBackend};

// Common constants
const MEDIA_CACHE_TTL_PRODUCTION_SECS: u64 = 24 * 60 * 60;
const MEDIA_CACHE_TTL_DEVELOPMENT_SECS: u64 = 60;
const SIGNED_URL_TTL_SECS: u64 = 15 * 60;
const SIGNED_URL_ACCESS_MARGIN_SECS: u64 = 2 * 60;
const HTTP_TIMEOUT_SECS: u64 = 30;
const MEDIA_CACHE_NAME: &str = "media-cache";
const DRAFT_CACHE_NAME: &str = "drafts";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Client-side caches
    pub cache_backend: CacheBackend,
    pub cache_dir: PathBuf,
    pub media_cache_name: String,
    pub draft_cache_name: String,
    pub media_cache_ttl: Duration,
    pub media_auth_token: Option<String>,
    pub http_timeout: Duration,
    // Server-side signing
    pub signed_url_ttl: Duration,
    pub signed_url_access_margin: Duration,
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub aws_region: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_signing_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            cache_backend: CacheBackend::Memory,
            cache_dir: default_cache_dir(),
            media_cache_name: MEDIA_CACHE_NAME.to_string(),
            draft_cache_name: DRAFT_CACHE_NAME.to_string(),
            media_cache_ttl: Duration::from_secs(MEDIA_CACHE_TTL_DEVELOPMENT_SECS),
            media_auth_token: None,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            signed_url_ttl: Duration::from_secs(SIGNED_URL_TTL_SECS),
            signed_url_access_margin: Duration::from_secs(SIGNED_URL_ACCESS_MARGIN_SECS),
            storage_backend: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_base_url: None,
            local_signing_secret: None,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("roomhub-cache")
}

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";

        // Short TTL outside production so expiry is observable while testing.
        let default_ttl = if is_production {
            MEDIA_CACHE_TTL_PRODUCTION_SECS
        } else {
            MEDIA_CACHE_TTL_DEVELOPMENT_SECS
        };

        let cache_backend = match env_opt("CACHE_BACKEND") {
            Some(v) => v.parse::<CacheBackend>()?,
            None => CacheBackend::Memory,
        };

        let storage_backend = env_opt("STORAGE_BACKEND")
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?;

        let config = Config {
            environment,
            cache_backend,
            cache_dir: env_opt("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
            media_cache_name: env_opt("MEDIA_CACHE_NAME")
                .unwrap_or_else(|| MEDIA_CACHE_NAME.to_string()),
            draft_cache_name: env_opt("DRAFT_CACHE_NAME")
                .unwrap_or_else(|| DRAFT_CACHE_NAME.to_string()),
            media_cache_ttl: Duration::from_secs(env_secs("MEDIA_CACHE_TTL_SECS", default_ttl)),
            media_auth_token: env_opt("MEDIA_AUTH_TOKEN"),
            http_timeout: Duration::from_secs(env_secs("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)),
            signed_url_ttl: Duration::from_secs(env_secs(
                "SIGNED_URL_TTL_SECS",
                SIGNED_URL_TTL_SECS,
            )),
            signed_url_access_margin: Duration::from_secs(env_secs(
                "SIGNED_URL_ACCESS_MARGIN_SECS",
                SIGNED_URL_ACCESS_MARGIN_SECS,
            )),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            local_signing_secret: env_opt("LOCAL_SIGNING_SECRET"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.media_cache_ttl.is_zero() {
            return Err(anyhow::anyhow!("MEDIA_CACHE_TTL_SECS must be greater than 0"));
        }

        if self.signed_url_ttl.is_zero() {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than 0"));
        }

        if self.signed_url_access_margin >= self.signed_url_ttl {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_ACCESS_MARGIN_SECS ({}) must be shorter than SIGNED_URL_TTL_SECS ({})",
                self.signed_url_access_margin.as_secs(),
                self.signed_url_ttl.as_secs()
            ));
        }

        if self.media_cache_name == self.draft_cache_name {
            return Err(anyhow::anyhow!(
                "MEDIA_CACHE_NAME and DRAFT_CACHE_NAME must name different caches"
            ));
        }

        if let Some(secret) = &self.local_signing_secret {
            if self.is_production() && secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "LOCAL_SIGNING_SECRET must be at least 32 characters long in production"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_signing_contract() {
        let config = Config::default();
        assert_eq!(config.signed_url_ttl, Duration::from_secs(900));
        assert_eq!(config.signed_url_access_margin, Duration::from_secs(120));
        assert!(!config.is_production());
        config.validate().unwrap();
    }

    #[test]
    fn margin_must_be_shorter_than_ttl() {
        let config = Config {
            signed_url_access_margin: Duration::from_secs(900),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SIGNED_URL_ACCESS_MARGIN_SECS"));
    }

    #[test]
    fn caches_must_not_share_a_name() {
        let config = Config {
            draft_cache_name: MEDIA_CACHE_NAME.to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_secret_rejected_only_in_production() {
        let dev = Config {
            local_signing_secret: Some("short".to_string()),
            ..Config::default()
        };
        dev.validate().unwrap();

        let prod = Config {
            environment: "Production".to_string(),
            ..dev
        };
        assert!(prod.is_production());
        assert!(prod.validate().is_err());
    }
}
