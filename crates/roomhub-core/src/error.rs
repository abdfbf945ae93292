//! Error types module
//!
//! `AppError` is the error surfaced at the boundary (signed-URL issuance,
//! CLI output). Crate-local errors such as `MediaError` convert into it
//! where a caller needs an HTTP-style status and a client-safe message.

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SIGNING_ERROR")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Signing(_) | AppError::Storage(_) | AppError::Internal(_) => 500,
            AppError::Fetch(_) => 502,
            AppError::Unauthorized(_) => 401,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Signing(_) => "SIGNING_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Fetch(_) => "FETCH_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Signing(_) => "Failed to issue a download URL".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Fetch(ref msg) | AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_failure_is_a_500() {
        let err = AppError::Signing("credentials expired".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "SIGNING_ERROR");
        assert!(err.to_string().contains("credentials expired"));
        // underlying message is not leaked to clients
        assert!(!err.client_message().contains("credentials"));
    }

    #[test]
    fn fetch_and_auth_failures_keep_their_message() {
        let err = AppError::Fetch("HTTP 404".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.client_message(), "HTTP 404");

        let err = AppError::Unauthorized("no token".to_string());
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[test]
    fn storage_details_are_hidden() {
        let err = AppError::Storage("/var/cache/roomhub: permission denied".to_string());
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(!err.client_message().contains("/var"));
    }
}
