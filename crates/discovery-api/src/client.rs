//! HTTP client for the discovery listing endpoints
//!
//! One [`DiscoveryClient`] serves every entity kind. Each kind has its own
//! endpoint and response shape:
//!
//! | Kind | Path | Objects | Ids |
//! |---|---|---|---|
//! | samples | `samples/index_v2.json` | `samples` | `all_samples_ids` |
//! | projects | `projects.json` | `projects` | `all_projects_ids` |
//! | workflow runs | `workflow_runs.json` | `workflow_runs` | `all_workflow_run_ids` |
//! | visualizations | `visualizations.json` | top-level array | derived |
//!
//! [`EndpointFetcher`] adapts one kind to the collection fetch contract.

use crate::config::ApiConfig;
use crate::entities::{Project, Sample, Visualization, WorkflowRun};
use crate::error::{fetch_error, status_error, ApiError};
use crate::query::encode_query;
use async_trait::async_trait;
use discovery_collection::{
    Entity, FetchError, FetchParams, FetchResponse, Identifier, ObjectFetcher,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// Condition naming the snapshot whose samples are listed
pub const SNAPSHOT_SHARE_ID_KEY: &str = "snapshotShareId";

/// Entity kinds served by the discovery API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// `samples/index_v2.json`
    Samples,
    /// `projects.json`
    Projects,
    /// `visualizations.json`
    Visualizations,
    /// `workflow_runs.json`
    WorkflowRuns,
}

impl EntityKind {
    /// All kinds
    pub const ALL: [Self; 4] = [
        Self::Samples,
        Self::Projects,
        Self::Visualizations,
        Self::WorkflowRuns,
    ];

    /// Short name of the kind
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Samples => "samples",
            Self::Projects => "projects",
            Self::Visualizations => "visualizations",
            Self::WorkflowRuns => "workflow_runs",
        }
    }

    /// Response field holding the objects; `None` for a top-level array
    #[inline]
    #[must_use]
    pub fn objects_field(self) -> Option<&'static str> {
        match self {
            Self::Samples => Some("samples"),
            Self::Projects => Some("projects"),
            Self::Visualizations => None,
            Self::WorkflowRuns => Some("workflow_runs"),
        }
    }

    /// Response field holding the full ordered id list
    #[inline]
    #[must_use]
    pub fn ids_field(self) -> Option<&'static str> {
        match self {
            Self::Samples => Some("all_samples_ids"),
            Self::Projects => Some("all_projects_ids"),
            Self::Visualizations => None,
            Self::WorkflowRuns => Some("all_workflow_run_ids"),
        }
    }

    /// Parameters sent as one JSON value rather than repeated keys
    fn json_keys(self) -> &'static [&'static str] {
        match self {
            Self::Samples => &["sampleIds"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown entity kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{0}' (expected one of: samples, projects, visualizations, workflow_runs)")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Client for the discovery listing endpoints
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct DiscoveryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: Url,
    config: ApiConfig,
}

impl DiscoveryClient {
    /// Create client from configuration
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] for invalid settings,
    /// [`ApiError::InvalidBaseUrl`] when the base URL is unusable and
    /// [`ApiError::Http`] when the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let base_url = parse_base_url(&config.base_url)?;
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(concat!("discovery-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                config,
            }),
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Normalised server root
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Fetcher for samples
    #[must_use]
    pub fn samples(&self) -> SampleFetcher {
        self.fetcher(EntityKind::Samples)
    }

    /// Fetcher for projects
    #[must_use]
    pub fn projects(&self) -> ProjectFetcher {
        self.fetcher(EntityKind::Projects)
    }

    /// Fetcher for visualizations
    #[must_use]
    pub fn visualizations(&self) -> VisualizationFetcher {
        self.fetcher(EntityKind::Visualizations)
    }

    /// Fetcher for workflow runs
    #[must_use]
    pub fn workflow_runs(&self) -> WorkflowRunFetcher {
        self.fetcher(EntityKind::WorkflowRuns)
    }

    /// Fetcher decoding `kind` listings as `T`
    #[must_use]
    pub fn fetcher<T>(&self, kind: EntityKind) -> EndpointFetcher<T> {
        EndpointFetcher {
            client: self.clone(),
            kind,
            _entity: PhantomData,
        }
    }

    /// Fetch one page of `kind`
    ///
    /// # Errors
    /// Transport, status and decoding failures as [`FetchError`].
    pub async fn fetch_page<T>(
        &self,
        kind: EntityKind,
        params: &FetchParams,
    ) -> Result<FetchResponse<T>, FetchError>
    where
        T: Entity + DeserializeOwned,
    {
        let url = self.endpoint_url(kind, params)?;
        let query = self.query_pairs(kind, params);
        debug!(
            %kind,
            %url,
            limit = params.limit,
            offset = params.offset,
            list_all_ids = params.list_all_ids,
            "requesting page"
        );

        let body = self.get_with_retry(&url, &query).await?;
        let response = decode_page::<T>(kind, body, params.list_all_ids)?;
        debug!(
            %kind,
            objects = response.objects.len(),
            ids = response.object_ids.as_ref().map(Vec::len),
            "page received"
        );
        Ok(response)
    }

    fn endpoint_url(&self, kind: EntityKind, params: &FetchParams) -> Result<Url, FetchError> {
        let path = match kind {
            EntityKind::Samples => match self.snapshot_share_id(params) {
                Some(share_id) => format!("pub/{share_id}/samples/index_v2.json"),
                None => "samples/index_v2.json".to_string(),
            },
            EntityKind::Projects => "projects.json".to_string(),
            EntityKind::Visualizations => "visualizations.json".to_string(),
            EntityKind::WorkflowRuns => "workflow_runs.json".to_string(),
        };
        self.inner
            .base_url
            .join(&path)
            .map_err(|e| FetchError::other(format!("invalid endpoint path '{path}': {e}")))
    }

    /// Snapshot from the view's conditions, else from the configuration
    fn snapshot_share_id<'a>(&'a self, params: &'a FetchParams) -> Option<&'a str> {
        params
            .conditions
            .get(SNAPSHOT_SHARE_ID_KEY)
            .and_then(Value::as_str)
            .or(self.inner.config.snapshot_share_id.as_deref())
    }

    fn query_pairs(&self, kind: EntityKind, params: &FetchParams) -> Vec<(String, String)> {
        let mut map: Map<String, Value> = params.to_query_map();
        match kind {
            EntityKind::Samples => {
                if let Some(share_id) = &self.inner.config.snapshot_share_id {
                    map.entry(SNAPSHOT_SHARE_ID_KEY)
                        .or_insert_with(|| Value::from(share_id.as_str()));
                }
            }
            EntityKind::WorkflowRuns => {
                map.entry("mode")
                    .or_insert_with(|| Value::from(self.inner.config.workflow_run_mode.as_str()));
            }
            EntityKind::Projects | EntityKind::Visualizations => {}
        }
        encode_query(&map, kind.json_keys())
    }

    async fn get_with_retry(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<Value, FetchError> {
        let max_attempts = self.inner.config.retry_max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.get_once(url, query).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < max_attempts && err.is_retryable() => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        %url,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "request failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.inner.config.retry_backoff_ms.saturating_mul(factor))
    }

    async fn get_once(&self, url: &Url, query: &[(String, String)]) -> Result<Value, FetchError> {
        let response = self
            .inner
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| fetch_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for DiscoveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// [`ObjectFetcher`] for one entity kind
pub struct EndpointFetcher<T> {
    client: DiscoveryClient,
    kind: EntityKind,
    _entity: PhantomData<fn() -> T>,
}

/// Sample listing fetcher
pub type SampleFetcher = EndpointFetcher<Sample>;
/// Project listing fetcher
pub type ProjectFetcher = EndpointFetcher<Project>;
/// Visualization listing fetcher
pub type VisualizationFetcher = EndpointFetcher<Visualization>;
/// Workflow run listing fetcher
pub type WorkflowRunFetcher = EndpointFetcher<WorkflowRun>;

impl<T> EndpointFetcher<T> {
    /// Kind this fetcher lists
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl<T> Clone for EndpointFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            kind: self.kind,
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for EndpointFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointFetcher")
            .field("kind", &self.kind)
            .field("base_url", &self.client.base_url().as_str())
            .finish()
    }
}

#[async_trait]
impl<T> ObjectFetcher<T> for EndpointFetcher<T>
where
    T: Entity + DeserializeOwned,
{
    async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError> {
        self.client.fetch_page(self.kind, &params).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ApiError::invalid_base_url(raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        let reason = format!("unsupported scheme '{}'", url.scheme());
        return Err(ApiError::invalid_base_url(raw, reason));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    Ok(url)
}

/// Split a response body into objects and the optional id list
fn decode_page<T>(
    kind: EntityKind,
    body: Value,
    list_all_ids: bool,
) -> Result<FetchResponse<T>, FetchError>
where
    T: Entity + DeserializeOwned,
{
    let decode = |e: serde_json::Error| FetchError::Decode(format!("{kind}: {e}"));

    let (Some(objects_field), Some(ids_field)) = (kind.objects_field(), kind.ids_field()) else {
        let objects: Vec<T> = serde_json::from_value(body).map_err(decode)?;
        let object_ids = list_all_ids.then(|| objects.iter().map(Entity::id).collect());
        return Ok(FetchResponse {
            objects,
            object_ids,
        });
    };

    let Value::Object(mut body) = body else {
        return Err(FetchError::Decode(format!("{kind}: expected a JSON object")));
    };
    let objects: Vec<T> = match body.remove(objects_field) {
        Some(value) => serde_json::from_value(value).map_err(decode)?,
        None => {
            return Err(FetchError::Decode(format!(
                "{kind}: response has no '{objects_field}' field"
            )))
        }
    };
    let object_ids: Option<Vec<Identifier>> = match body.remove(ids_field) {
        None | Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value(value).map_err(decode)?),
    };
    // Workflow runs report ids only for id-list requests
    let object_ids = if kind == EntityKind::WorkflowRuns && !list_all_ids {
        None
    } else {
        object_ids
    };

    Ok(FetchResponse {
        objects,
        object_ids,
    })
}
