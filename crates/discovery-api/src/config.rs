//! Client configuration
//!
//! Loaded from TOML; every field is optional and falls back to the
//! defaults below.
//!
//! ```toml
//! base_url = "https://discovery.example.org"
//! timeout_ms = 30000
//! page_size = 50
//! retry_max_attempts = 3
//! ```

use crate::error::ApiError;
use discovery_collection::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default server address
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default `mode` sent to the workflow runs endpoint
pub const DEFAULT_WORKFLOW_RUN_MODE: &str = "with_sample_info";

/// Settings for [`crate::DiscoveryClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server root; endpoint paths are resolved against it
    pub base_url: String,
    /// Whole-request timeout
    pub timeout_ms: u64,
    /// Connection establishment timeout
    pub connect_timeout_ms: u64,
    /// Rows per page for views created by the command-line browser
    pub page_size: usize,
    /// Public snapshot to browse samples of, if any
    pub snapshot_share_id: Option<String>,
    /// `mode` parameter for workflow run listings
    pub workflow_run_mode: String,
    /// Attempts per request, including the first
    pub retry_max_attempts: u32,
    /// Base delay between attempts, doubled each retry
    pub retry_backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            page_size: DEFAULT_PAGE_SIZE,
            snapshot_share_id: None,
            workflow_run_mode: DEFAULT_WORKFLOW_RUN_MODE.to_string(),
            retry_max_attempts: 1,
            retry_backoff_ms: 250,
        }
    }
}

impl ApiConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With server root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request and connect timeouts
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, timeout_ms: u64, connect_timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self.connect_timeout_ms = connect_timeout_ms;
        self
    }

    /// With page size (at least one row)
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// With snapshot share id
    #[inline]
    #[must_use]
    pub fn with_snapshot_share_id(mut self, share_id: impl Into<String>) -> Self {
        self.snapshot_share_id = Some(share_id.into());
        self
    }

    /// With workflow run listing mode
    #[inline]
    #[must_use]
    pub fn with_workflow_run_mode(mut self, mode: impl Into<String>) -> Self {
        self.workflow_run_mode = mode.into();
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retries(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.retry_max_attempts = max_attempts;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Parse and validate TOML configuration
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] for malformed TOML or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self, ApiError> {
        let config: Self = toml::from_str(content).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file
    ///
    /// # Errors
    /// Returns [`ApiError::Io`] when the file cannot be read and
    /// [`ApiError::Config`] when its content is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ApiError::io_error(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(ApiError::Config("page_size must be at least 1".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ApiError::Config("timeout_ms must be positive".to_string()));
        }
        if self.workflow_run_mode.is_empty() {
            return Err(ApiError::Config(
                "workflow_run_mode must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
