//! Shared entity cache for one domain and entity kind
//!
//! A [`Collection`] owns the deduplicated, ever-growing map of entities
//! fetched for its domain and manufactures [`CollectionView`]s. Views
//! created from the same collection share its entries: whatever one view
//! fetched is visible to all of them.

use crate::error::FetchError;
use crate::fetch::{FetchParams, FetchResponse, ObjectFetcher};
use crate::types::{Conditions, Entity, Identifier};
use crate::view::CollectionView;
use dashmap::DashMap;
use std::sync::Arc;

/// Default number of rows per page for new views
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Callback fired when a view receives a new ordered id list
pub type ViewChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Cache of entities for one domain
///
/// Cloning is cheap and yields another handle to the same store.
pub struct Collection<T: Entity> {
    inner: Arc<Store<T>>,
}

struct Store<T: Entity> {
    /// Partition key (my_data, public, all_data, snapshot)
    domain: String,
    /// Every entity fetched so far, by id. Never evicted.
    entries: DashMap<Identifier, T>,
    fetcher: Arc<dyn ObjectFetcher<T>>,
}

impl<T: Entity> Collection<T> {
    /// Create collection for `domain` fed by `fetcher`
    #[must_use]
    pub fn new(domain: impl Into<String>, fetcher: impl ObjectFetcher<T> + 'static) -> Self {
        Self::with_shared_fetcher(domain, Arc::new(fetcher))
    }

    /// Create collection around an already shared fetcher
    #[must_use]
    pub fn with_shared_fetcher(
        domain: impl Into<String>,
        fetcher: Arc<dyn ObjectFetcher<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Store {
                domain: domain.into(),
                entries: DashMap::new(),
                fetcher,
            }),
        }
    }

    /// Domain this collection is scoped to
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    /// Create a view onto this collection
    #[must_use]
    pub fn create_view(&self, options: ViewOptions) -> CollectionView<T> {
        CollectionView::new(self.clone(), options)
    }

    /// Insert or replace an entity at its id
    ///
    /// Used when code outside the views changes a single entity and the
    /// cache should reflect it. Last write wins.
    pub fn update(&self, entity: T) {
        self.inner.entries.insert(entity.id(), entity);
    }

    /// Cached entity by id
    #[must_use]
    pub fn get(&self, id: &Identifier) -> Option<T> {
        self.inner.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Check if an entity is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.inner.entries.contains_key(id)
    }

    /// Number of cached entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Check if nothing has been cached yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub(crate) async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError> {
        self.inner.fetcher.fetch(params).await
    }

    /// Merge fetched objects, optionally normalising ids to strings
    pub(crate) fn merge(&self, objects: Vec<T>, convert_ids_to_string: bool) {
        for mut object in objects {
            let id = if convert_ids_to_string {
                let id = object.id().into_string_form();
                object.set_id(id.clone());
                id
            } else {
                object.id()
            };
            self.inner.entries.insert(id, object);
        }
    }
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("domain", &self.inner.domain)
            .field("entries", &self.inner.entries.len())
            .finish_non_exhaustive()
    }
}

/// Options for [`Collection::create_view`]
#[derive(Clone)]
pub struct ViewOptions {
    /// Conditions sent with every fetch of the view
    pub conditions: Conditions,
    /// Rows per page for [`CollectionView::load_page`]
    pub page_size: usize,
    /// Fired after the view receives a new ordered id list
    pub on_view_change: Option<ViewChangeCallback>,
    /// Normalise every id to its string form before storing it
    ///
    /// Needed when one table mixes entity kinds whose raw ids differ in
    /// type and selection relies on id equality.
    pub convert_ids_to_string: bool,
}

impl ViewOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With conditions
    #[inline]
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// With page size (at least one row)
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// With change callback
    #[inline]
    #[must_use]
    pub fn on_view_change(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_view_change = Some(Arc::new(callback));
        self
    }

    /// With string id normalisation
    #[inline]
    #[must_use]
    pub fn convert_ids_to_string(mut self, convert: bool) -> Self {
        self.convert_ids_to_string = convert;
        self
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            conditions: Conditions::new(),
            page_size: DEFAULT_PAGE_SIZE,
            on_view_change: None,
            convert_ids_to_string: false,
        }
    }
}

impl std::fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOptions")
            .field("conditions", &self.conditions)
            .field("page_size", &self.page_size)
            .field("on_view_change", &self.on_view_change.is_some())
            .field("convert_ids_to_string", &self.convert_ids_to_string)
            .finish()
    }
}
