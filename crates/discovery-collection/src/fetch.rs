//! Fetch contract between collections and the remote API
//!
//! A collection is fed by an [`ObjectFetcher`]. Views call it with the
//! collection's domain, their own conditions, and a limit/offset window
//! covering the rows they are missing.

use crate::error::FetchError;
use crate::types::{Conditions, Entity, Identifier};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Parameters of a single page request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    /// Domain of the requesting collection
    pub domain: String,
    /// Conditions of the requesting view
    pub conditions: Conditions,
    /// Maximum number of objects to return
    pub limit: usize,
    /// Number of objects to skip
    pub offset: usize,
    /// Whether the full ordered id list should be returned as well
    pub list_all_ids: bool,
}

impl FetchParams {
    /// Flatten into the wire shape `{ domain, ...conditions, limit, offset, listAllIds }`
    ///
    /// Later keys win: a condition named `domain` overrides the collection
    /// domain, and conditions can never override the paging keys.
    #[must_use]
    pub fn to_query_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("domain".to_string(), Value::from(self.domain.as_str()));
        for (key, value) in self.conditions.iter() {
            map.insert(key.clone(), value.clone());
        }
        map.insert("limit".to_string(), Value::from(self.limit));
        map.insert("offset".to_string(), Value::from(self.offset));
        map.insert("listAllIds".to_string(), Value::from(self.list_all_ids));
        map
    }
}

/// Objects returned for a page request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse<T> {
    /// Objects in the requested window
    pub objects: Vec<T>,
    /// Full ordered id list, present only when `list_all_ids` was requested
    pub object_ids: Option<Vec<Identifier>>,
}

impl<T> FetchResponse<T> {
    /// Response without an id list
    #[inline]
    #[must_use]
    pub fn new(objects: Vec<T>) -> Self {
        Self {
            objects,
            object_ids: None,
        }
    }

    /// With the full ordered id list
    #[inline]
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<Identifier>) -> Self {
        self.object_ids = Some(ids);
        self
    }
}

impl<T> Default for FetchResponse<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Source of entities for a collection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectFetcher<T: Entity>: Send + Sync {
    /// Fetch one window of objects
    ///
    /// # Errors
    /// Any failure is propagated unchanged to every caller waiting on the
    /// request.
    async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError>;
}

#[async_trait]
impl<T, F> ObjectFetcher<T> for Arc<F>
where
    T: Entity,
    F: ObjectFetcher<T> + ?Sized,
{
    async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError> {
        (**self).fetch(params).await
    }
}

/// Fetcher backed by an async closure
///
/// Created with [`fetch_fn`].
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

/// Wrap an async closure as an [`ObjectFetcher`]
///
/// ```rust
/// use discovery_collection::{fetch_fn, Collection, FetchError, FetchResponse, Record};
///
/// let collection: Collection<Record> = Collection::new(
///     "my_data",
///     fetch_fn(|params| async move {
///         let rows: Vec<Record> = (params.offset..params.offset + params.limit)
///             .map(|i| Record::new(i as i64))
///             .collect();
///         Ok::<_, FetchError>(FetchResponse::new(rows))
///     }),
/// );
/// assert_eq!(collection.domain(), "my_data");
/// ```
pub fn fetch_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(FetchParams) -> Fut,
{
    FnFetcher { f }
}

#[async_trait]
impl<T, F, Fut> ObjectFetcher<T> for FnFetcher<F>
where
    T: Entity,
    F: Fn(FetchParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse<T>, FetchError>> + Send + 'static,
{
    async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError> {
        (self.f)(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    fn params() -> FetchParams {
        FetchParams {
            domain: "my_data".to_string(),
            conditions: Conditions::new()
                .with("search", "flu")
                .with("limit", 999)
                .with("orderBy", "name"),
            limit: 50,
            offset: 100,
            list_all_ids: true,
        }
    }

    #[test]
    fn query_map_merges_in_order() {
        let map = params().to_query_map();
        assert_eq!(map["domain"], Value::from("my_data"));
        assert_eq!(map["search"], Value::from("flu"));
        assert_eq!(map["orderBy"], Value::from("name"));
        // paging keys always win over conditions
        assert_eq!(map["limit"], Value::from(50));
        assert_eq!(map["offset"], Value::from(100));
        assert_eq!(map["listAllIds"], Value::from(true));
    }

    #[test]
    fn query_map_condition_overrides_domain() {
        let mut params = params();
        params.conditions.insert("domain", "snapshot");
        assert_eq!(params.to_query_map()["domain"], Value::from("snapshot"));
    }

    #[tokio::test]
    async fn fn_fetcher_forwards_params() {
        let fetcher = fetch_fn(|params: FetchParams| async move {
            Ok::<_, FetchError>(FetchResponse::new(vec![Record::new(params.offset as i64)]))
        });
        let response = ObjectFetcher::<Record>::fetch(&fetcher, params()).await.unwrap();
        assert_eq!(response.objects, vec![Record::new(100)]);
        assert!(response.object_ids.is_none());
    }

    #[tokio::test]
    async fn arc_fetcher_delegates() {
        let fetcher = Arc::new(fetch_fn(|_params: FetchParams| async move {
            Err::<FetchResponse<Record>, _>(FetchError::other("down"))
        }));
        let err = ObjectFetcher::<Record>::fetch(&fetcher, params())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Other("down".to_string()));
    }
}
