//! Discovery API
//!
//! HTTP-backed collections for the discovery listing endpoints.
//!
//! # Overview
//!
//! - **DiscoveryClient**: configured `reqwest` client with per-kind
//!   endpoint fetchers
//! - **DiscoveryDataLayer**: the collections of one discovery domain
//! - **ApiConfig**: TOML-loadable client settings
//!
//! # Example
//!
//! ```rust,no_run
//! use discovery_api::{ApiConfig, DiscoveryClient, DiscoveryDataLayer, DiscoveryDomain};
//! use discovery_collection::ViewOptions;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DiscoveryClient::new(ApiConfig::new().with_base_url("http://localhost:3000"))?;
//! let layer = DiscoveryDataLayer::new(DiscoveryDomain::MyData, client);
//!
//! let view = layer.samples.create_view(ViewOptions::new().with_page_size(25));
//! let first_page = view.load_page(0).await?;
//! println!("{} of {} samples", first_page.len(), view.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod client;
pub mod config;
pub mod data_layer;
pub mod domain;
pub mod entities;
pub mod error;
pub mod query;

// Re-exports
pub use client::{
    DiscoveryClient, EndpointFetcher, EntityKind, ProjectFetcher, SampleFetcher, UnknownKind,
    VisualizationFetcher, WorkflowRunFetcher, SNAPSHOT_SHARE_ID_KEY,
};
pub use config::ApiConfig;
pub use data_layer::DiscoveryDataLayer;
pub use domain::{DiscoveryDomain, UnknownDomain};
pub use entities::{Project, Sample, Visualization, WorkflowRun};
pub use error::ApiError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
