//! Discovery Collections
//!
//! Client-side caches of paginated remote collections.
//!
//! # Overview
//!
//! - **Collection**: shared, ever-growing cache of one entity kind in one
//!   domain, fed by an [`ObjectFetcher`]
//! - **CollectionView**: per-query window onto a collection that fetches
//!   only missing rows and coalesces identical in-flight requests
//!
//! # Example
//!
//! ```rust
//! use discovery_collection::{
//!     fetch_fn, Collection, FetchError, FetchParams, FetchResponse, Identifier, Record,
//!     ViewOptions,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FetchError> {
//! let samples: Collection<Record> = Collection::new(
//!     "my_data",
//!     fetch_fn(|params: FetchParams| async move {
//!         let objects = vec![Record::new(1), Record::new(2)];
//!         let mut response = FetchResponse::new(objects);
//!         if params.list_all_ids {
//!             response = response.with_ids(vec![Identifier::Int(1), Identifier::Int(2)]);
//!         }
//!         Ok::<_, FetchError>(response)
//!     }),
//! );
//!
//! let view = samples.create_view(ViewOptions::new().with_page_size(2));
//! let rows = view.load_page(0).await?;
//! assert_eq!(rows.len(), 2);
//! assert_eq!(view.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod collection;
pub mod error;
pub mod fetch;
pub mod types;
pub mod view;

// Re-exports
pub use collection::{Collection, ViewChangeCallback, ViewOptions, DEFAULT_PAGE_SIZE};
pub use error::FetchError;
pub use fetch::{fetch_fn, FetchParams, FetchResponse, FnFetcher, ObjectFetcher};
pub use types::{Conditions, Entity, Identifier, Record, RowRange};
pub use view::{CollectionView, ResetOptions};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with collections
    pub use crate::{
        Collection, CollectionView, Conditions, Entity, FetchError, FetchParams, FetchResponse,
        Identifier, ObjectFetcher, ResetOptions, RowRange, ViewOptions,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
