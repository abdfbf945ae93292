//! Network side of the media pipeline.
//!
//! [`MediaFetcher`] performs one GET and hands back the body with the headers
//! the media endpoint uses to describe it. [`FetchedMedia::into_data_url`]
//! turns that into a self-contained `data:` URL.

use async_trait::async_trait;
use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use bytes::Bytes;
use roomhub_core::Config;
use std::time::Duration;

/// Response header naming the body encoding ("BASE64" when the body is already base64 text).
pub const CONTENT_ENCODING_HEADER: &str = "x-content-encoding";
/// Response header carrying the real media type of a base64 body.
pub const DECODED_CONTENT_TYPE_HEADER: &str = "x-decoded-content-type";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// Servers may omit padding on base64 bodies.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("No access token available for an authenticated fetch")]
    MissingToken,

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// A successful (2xx) media response.
#[derive(Debug, Clone, Default)]
pub struct FetchedMedia {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub decoded_content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedMedia {
    pub fn is_base64_body(&self) -> bool {
        self.decoded_content_type.is_some()
            && self
                .content_encoding
                .as_deref()
                .is_some_and(|enc| enc.eq_ignore_ascii_case("base64"))
    }

    /// Build a `data:` URL. A body flagged as base64 text is labelled with the
    /// decoded content type and re-emitted as one padded line (line breaks and
    /// missing padding are accepted); anything else is encoded here.
    pub fn into_data_url(self) -> Result<String, FetchError> {
        if self.is_base64_body() {
            let mime = self.decoded_content_type.unwrap_or_default();
            let text = std::str::from_utf8(&self.body)
                .map_err(|e| FetchError::InvalidBody(format!("base64 body is not UTF-8: {}", e)))?;
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let decoded = LENIENT_BASE64
                .decode(&compact)
                .map_err(|e| FetchError::InvalidBody(format!("malformed base64 body: {}", e)))?;
            return Ok(format!(
                "data:{};base64,{}",
                mime,
                general_purpose::STANDARD.encode(decoded)
            ));
        }

        let mime = self
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        Ok(format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(&self.body)
        ))
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// GET `url`, sending `Authorization: Bearer <token>` when a token is given.
    /// Non-2xx responses are errors.
    async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> Result<FetchedMedia, FetchError>;
}

/// Supplies the bearer token for authenticated fetches.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<Option<String>, FetchError>;
}

/// Fixed token, typically `MEDIA_AUTH_TOKEN`.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<Option<String>, FetchError> {
        Ok(self.token.clone())
    }
}

/// reqwest-backed fetcher.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(config.http_timeout)
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> Result<FetchedMedia, FetchError> {
        let start = std::time::Instant::now();

        let mut request = self.client.get(url);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Media fetch rejected"
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response.headers();
        let content_type = header_value(headers, reqwest::header::CONTENT_TYPE.as_str());
        let content_encoding = header_value(headers, CONTENT_ENCODING_HEADER);
        let decoded_content_type = header_value(headers, DECODED_CONTENT_TYPE_HEADER);

        let body = response.bytes().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(
            url = %url,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media fetch successful"
        );

        Ok(FetchedMedia {
            content_type,
            content_encoding,
            decoded_content_type,
            body,
        })
    }
}
