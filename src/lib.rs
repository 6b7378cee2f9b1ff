//! hojear - Paginated record browsing in Pure Rust
//!
//! A small component set for browsing tabular registration datasets:
//! load records from JSON, CSV or XLSX, answer paginated and filtered
//! page queries over the in-memory dataset, memoize pages in a
//! prefetching cache, and serve the whole thing over HTTP.
//!
//! # Design Principles
//!
//! 1. **Whole dataset in memory** - datasets are a few thousand rows;
//!    every query is a single pass over an immutable `Vec`
//! 2. **Pure query engine** - [`query`] is a function of its inputs,
//!    safe to call from anywhere without synchronization
//! 3. **Explicit cache ownership** - [`PageCache`] is constructed empty
//!    and injected, never global
//! 4. **Typed errors end to end** - a bad filter column is
//!    [`Error::ColumnNotFound`], never a silent empty page
//!
//! # Quick Start
//!
//! ```
//! use hojear::{query, Dataset, PageRequest};
//!
//! let dataset = Dataset::from_json_str(r#"[
//!     {"legal_name": "Acme Freight", "entity_type": "CARRIER"},
//!     {"legal_name": "Best Brokerage", "entity_type": "BROKER"}
//! ]"#).unwrap();
//!
//! let page = query(&dataset, &PageRequest::new(1, 10)).unwrap();
//! assert_eq!(page.total_count, 2);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod cache;
pub mod dataset;
pub mod error;
pub mod pivot;
pub mod query;
pub mod record;
#[cfg(feature = "serve")]
pub mod serve;

pub use cache::{DatasetQuery, PageCache, PageCacheKey, PageFetcher};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use pivot::{pivot, PivotRow};
pub use query::{query, total_pages, Filter, PageRequest, PageResult};
pub use record::Record;
#[cfg(feature = "serve")]
pub use serve::AppState;
