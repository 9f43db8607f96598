//! Windowed views onto a collection
//!
//! A [`CollectionView`] answers "which entities are at rows
//! `[start, stop]` of my query", fetching only what its collection is
//! missing:
//! - The first fetch asks for the full ordered id list of the query
//! - Later fetches only cover the span of missing rows
//! - Identical concurrent range requests share one in-flight fetch
//! - A started fetch runs to completion on the runtime even when every
//!   caller stops waiting for it
//!
//! Overlapping but non-identical ranges are not deduplicated.

use crate::collection::{Collection, ViewChangeCallback, ViewOptions};
use crate::error::FetchError;
use crate::fetch::{FetchParams, FetchResponse};
use crate::types::{Conditions, Entity, Identifier, RowRange};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type RowsFuture<T> = Shared<BoxFuture<'static, Result<Vec<T>, FetchError>>>;

/// Per-query window onto a [`Collection`]
///
/// Cloning yields another handle to the same view, so concurrent callers
/// share its in-flight requests.
pub struct CollectionView<T: Entity> {
    inner: Arc<ViewInner<T>>,
}

struct ViewInner<T: Entity> {
    collection: Collection<T>,
    page_size: usize,
    convert_ids_to_string: bool,
    on_view_change: Option<ViewChangeCallback>,
    state: Mutex<ViewState<T>>,
}

struct ViewState<T: Entity> {
    conditions: Conditions,
    /// Ordered ids of the whole result set; `None` until the first fetch
    /// returning ids, and again after a reset.
    ordered_ids: Option<Vec<Identifier>>,
    loading: bool,
    /// In-flight fetches keyed by the exact requested range
    active: HashMap<RowRange, InFlight<T>>,
    next_generation: u64,
}

struct InFlight<T: Entity> {
    generation: u64,
    rows: RowsFuture<T>,
}

/// Options for [`CollectionView::reset`]
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Replacement conditions; current ones are kept when `None`
    pub conditions: Option<Conditions>,
    /// Start loading page 0 right away
    pub load_first_page: bool,
}

impl ResetOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With replacement conditions
    #[inline]
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Load the first page after resetting
    #[inline]
    #[must_use]
    pub fn load_first_page(mut self) -> Self {
        self.load_first_page = true;
        self
    }
}

impl<T: Entity> CollectionView<T> {
    pub(crate) fn new(collection: Collection<T>, options: ViewOptions) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                collection,
                page_size: options.page_size.max(1),
                convert_ids_to_string: options.convert_ids_to_string,
                on_view_change: options.on_view_change,
                state: Mutex::new(ViewState {
                    conditions: options.conditions,
                    ordered_ids: None,
                    loading: true,
                    active: HashMap::new(),
                    next_generation: 0,
                }),
            }),
        }
    }

    /// Load rows of page `page`
    ///
    /// # Errors
    /// Propagates the fetcher's failure.
    pub async fn load_page(&self, page: usize) -> Result<Vec<T>, FetchError> {
        self.handle_load_object_rows(RowRange::page(page, self.inner.page_size))
            .await
    }

    /// Entities at rows `range.start..=range.stop` of this view
    ///
    /// Fetches whatever the collection is missing. A request for a range
    /// that is already in flight waits for that fetch instead of issuing
    /// a new one. The result may be shorter than requested when the query
    /// has fewer rows.
    ///
    /// Dropping the returned future does not cancel the fetch; on a tokio
    /// runtime it still completes and merges its rows.
    ///
    /// # Errors
    /// Propagates the fetcher's failure to every caller sharing the fetch.
    pub async fn handle_load_object_rows(&self, range: RowRange) -> Result<Vec<T>, FetchError> {
        let (pending, started) = {
            let mut state = self.inner.state.lock();
            if let Some(request) = state.active.get(&range) {
                debug!(%range, "joining in-flight row request");
                (request.rows.clone(), false)
            } else {
                let generation = state.next_generation;
                state.next_generation += 1;
                let rows = Self::run_request(Arc::clone(&self.inner), range, generation)
                    .boxed()
                    .shared();
                state.active.insert(
                    range,
                    InFlight {
                        generation,
                        rows: rows.clone(),
                    },
                );
                (rows, true)
            }
        };

        // Outside a runtime the fetch only progresses while callers poll it.
        if started {
            if let Ok(runtime) = Handle::try_current() {
                runtime.spawn(pending.clone());
            }
        }

        pending.await
    }

    /// Fetch `range`, then drop its in-flight entry
    ///
    /// A reset may have replaced the entry with a newer request, which is
    /// left alone.
    async fn run_request(
        inner: Arc<ViewInner<T>>,
        range: RowRange,
        generation: u64,
    ) -> Result<Vec<T>, FetchError> {
        let result = Self::fetch_object_rows(Arc::clone(&inner), range).await;

        let mut state = inner.state.lock();
        if state
            .active
            .get(&range)
            .is_some_and(|current| current.generation == generation)
        {
            state.active.remove(&range);
        }
        drop(state);

        result
    }

    async fn fetch_object_rows(
        inner: Arc<ViewInner<T>>,
        range: RowRange,
    ) -> Result<Vec<T>, FetchError> {
        let (window, request) = {
            let state = inner.state.lock();
            let window = range.window(state.ordered_ids.as_ref().map(Vec::len));
            let request = inner
                .missing_span(&state, window.clone())
                .map(|span| FetchParams {
                    domain: inner.collection.domain().to_string(),
                    conditions: state.conditions.clone(),
                    limit: span.end - span.start,
                    offset: span.start,
                    list_all_ids: state.ordered_ids.is_none(),
                });
            (window, request)
        };

        match request {
            Some(params) => {
                debug!(
                    domain = %params.domain,
                    limit = params.limit,
                    offset = params.offset,
                    list_all_ids = params.list_all_ids,
                    "fetching missing rows"
                );
                let response = inner.collection.fetch(params).await.map_err(|err| {
                    warn!(%range, error = %err, "row fetch failed");
                    err
                })?;
                inner.apply_response(response);
            }
            None => debug!(%range, "rows served from cache"),
        }

        Ok(inner.read_rows(window))
    }

    /// Reset the query window
    ///
    /// Clears the ordered ids and the in-flight tracker and marks the view
    /// as loading. Entities already in the collection stay cached. Fetches
    /// still in flight run to completion and merge their results.
    ///
    /// With `load_first_page`, page 0 starts loading on the tokio runtime
    /// and the task handle is returned.
    ///
    /// # Panics
    /// With `load_first_page`, panics if called outside a tokio runtime.
    pub fn reset(&self, options: ResetOptions) -> Option<JoinHandle<Result<Vec<T>, FetchError>>> {
        {
            let mut state = self.inner.state.lock();
            if let Some(conditions) = options.conditions {
                state.conditions = conditions;
            }
            state.ordered_ids = None;
            state.loading = true;
            let orphaned = state.active.len();
            state.active.clear();
            debug!(orphaned, "view reset");
        }

        options.load_first_page.then(|| {
            let view = self.clone();
            tokio::spawn(async move { view.load_page(0).await })
        })
    }

    /// Loaded entities in query order
    ///
    /// Skips ids whose entity has not arrived yet.
    #[must_use]
    pub fn loaded(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        state
            .ordered_ids
            .iter()
            .flatten()
            .filter_map(|id| self.inner.collection.get(id))
            .collect()
    }

    /// Number of rows in the query; 0 until known
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().ordered_ids.as_ref().map_or(0, Vec::len)
    }

    /// Check if the query has no known rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entity by id, from the whole collection
    ///
    /// The id is normalised the same way fetched ids are.
    #[must_use]
    pub fn get(&self, id: &Identifier) -> Option<T> {
        if self.inner.convert_ids_to_string {
            self.inner.collection.get(&id.to_string_form())
        } else {
            self.inner.collection.get(id)
        }
    }

    /// Ordered ids of the query; empty until known
    #[must_use]
    pub fn ids(&self) -> Vec<Identifier> {
        self.inner.state.lock().ordered_ids.clone().unwrap_or_default()
    }

    /// Ids from the first to the last occurrence of either id, inclusive
    ///
    /// Supports range selection between two rows. Empty when neither id
    /// is part of the query.
    #[must_use]
    pub fn intermediate_ids(&self, id1: &Identifier, id2: &Identifier) -> Vec<Identifier> {
        let state = self.inner.state.lock();
        let Some(ids) = state.ordered_ids.as_ref() else {
            return Vec::new();
        };
        let first = ids.iter().position(|id| id == id1 || id == id2);
        let last = ids.iter().rposition(|id| id == id1 || id == id2);
        match (first, last) {
            (Some(first), Some(last)) => ids[first..=last].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Check if the view is waiting for its ordered ids
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    /// Current conditions
    #[must_use]
    pub fn conditions(&self) -> Conditions {
        self.inner.state.lock().conditions.clone()
    }

    /// Rows per page
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.inner.page_size
    }

    /// Domain of the backing collection
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.inner.collection.domain()
    }

    /// Backing collection
    #[inline]
    #[must_use]
    pub fn collection(&self) -> &Collection<T> {
        &self.inner.collection
    }

    /// Number of range requests currently in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().active.len()
    }
}

impl<T: Entity> ViewInner<T> {
    /// Smallest span covering every missing index of `window`
    ///
    /// Without known ids the whole window counts as missing.
    fn missing_span(&self, state: &ViewState<T>, window: Range<usize>) -> Option<Range<usize>> {
        match &state.ordered_ids {
            Some(ids) => {
                let mut missing = window.filter(|&idx| !self.collection.contains(&ids[idx]));
                let first = missing.next()?;
                let last = missing.last().unwrap_or(first);
                Some(first..last + 1)
            }
            None => (!window.is_empty()).then_some(window),
        }
    }

    fn apply_response(&self, response: FetchResponse<T>) {
        let FetchResponse {
            objects,
            object_ids,
        } = response;
        self.collection.merge(objects, self.convert_ids_to_string);

        let replaced = {
            let mut state = self.state.lock();
            state.loading = false;
            match object_ids {
                Some(ids) => {
                    let ids: Vec<Identifier> = if self.convert_ids_to_string {
                        ids.into_iter().map(Identifier::into_string_form).collect()
                    } else {
                        ids
                    };
                    info!(
                        domain = %self.collection.domain(),
                        count = ids.len(),
                        "received ordered ids"
                    );
                    state.ordered_ids = Some(ids);
                    true
                }
                None => false,
            }
        };

        if replaced {
            if let Some(callback) = &self.on_view_change {
                callback();
            }
        }
    }

    fn read_rows(&self, window: Range<usize>) -> Vec<T> {
        let state = self.state.lock();
        let Some(ids) = state.ordered_ids.as_ref() else {
            return Vec::new();
        };
        let end = window.end.min(ids.len());
        (window.start..end)
            .filter_map(|idx| {
                let entity = self.collection.get(&ids[idx]);
                if entity.is_none() {
                    warn!(index = idx, id = %ids[idx], "ordered id has no cached entity");
                }
                entity
            })
            .collect()
    }
}

impl<T: Entity> Clone for CollectionView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> std::fmt::Debug for CollectionView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CollectionView")
            .field("domain", &self.inner.collection.domain())
            .field("conditions", &state.conditions)
            .field("len", &state.ordered_ids.as_ref().map(Vec::len))
            .field("loading", &state.loading)
            .field("in_flight", &state.active.len())
            .field("page_size", &self.inner.page_size)
            .finish()
    }
}
