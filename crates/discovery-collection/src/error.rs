//! Error types for collection fetches
//!
//! The data layer has a single failure mode: the remote fetch was rejected.
//! Errors are cloneable because one in-flight fetch may be awaited by
//! several callers, and each of them receives the same failure.

/// Failure reported by an [`ObjectFetcher`](crate::ObjectFetcher)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request never produced a response (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("server returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// Any other fetcher-specific failure
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Create a failure from any displayable reason
    #[inline]
    pub fn other(reason: impl std::fmt::Display) -> Self {
        Self::Other(reason.to_string())
    }

    /// Check if repeating the same request could succeed
    ///
    /// The collection never retries on its own; this is a hint for callers
    /// deciding whether to offer a retry.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Other(_) => false,
        }
    }
}
