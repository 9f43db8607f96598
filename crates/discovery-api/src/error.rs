//! Error types for the discovery API client
//!
//! Covers the two places things go wrong:
//! - Building a client (bad base URL, unreadable or invalid config)
//! - Translating HTTP failures into the collection-level [`FetchError`]

use discovery_collection::FetchError;
use std::path::PathBuf;

/// Errors while configuring or constructing a [`crate::DiscoveryClient`]
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Base URL does not parse or is not http(s)
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as given
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration content is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// Create invalid base URL error
    pub fn invalid_base_url(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Longest response body excerpt kept in a status error
const MAX_ERROR_BODY: usize = 200;

/// Classify a transport-level `reqwest` failure
pub(crate) fn fetch_error(err: &reqwest::Error) -> FetchError {
    if let Some(status) = err.status() {
        FetchError::Status {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Status error carrying the start of the response body
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> FetchError {
    let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();
    }
    FetchError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_error_uses_body_excerpt() {
        let err = status_error(StatusCode::BAD_GATEWAY, &"x".repeat(500));
        match err {
            FetchError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_reason() {
        let err = status_error(StatusCode::NOT_FOUND, "  ");
        assert_eq!(
            err,
            FetchError::Status {
                status: 404,
                message: "Not Found".to_string()
            }
        );
        assert!(!err.is_retryable());
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
    }

    #[test]
    fn api_error_messages() {
        let err = ApiError::invalid_base_url("ftp://x", "unsupported scheme");
        assert_eq!(
            err.to_string(),
            "invalid base url 'ftp://x': unsupported scheme"
        );
        let err = ApiError::io_error(
            "/missing.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().starts_with("io error reading /missing.toml"));
    }
}
