//! Paginated, filterable record queries.
//!
//! [`query`] is the deterministic, stateless mapping from a dataset and a
//! [`PageRequest`] to a [`PageResult`]: filter in source order, then
//! slice. It holds no shared state and is safe to call concurrently from
//! any number of callers.

use serde::{Deserialize, Serialize};

use crate::{
    dataset::Dataset,
    error::{Error, Result},
    record::Record,
};

/// A single column/value substring filter.
///
/// Matching is case-insensitive: a record matches when the string
/// coercion of its column value contains the filter value as a
/// substring. Records whose column value is null or absent never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// The column to match against.
    pub column: String,
    /// The substring to search for.
    pub value: String,
}

impl Filter {
    /// Creates a filter.
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn matches(&self, record: &Record, needle_lower: &str) -> bool {
        record
            .text(&self.column)
            .is_some_and(|text| text.to_lowercase().contains(needle_lower))
    }
}

/// One page request against a dataset: a 1-based page number, a page
/// size, and an optional filter.
///
/// The column/value pairing of a filter is structural: there is no way
/// to request a filter column without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
    filter: Option<Filter>,
}

impl PageRequest {
    /// The default page size when a caller does not specify one.
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Creates an unfiltered page request.
    ///
    /// `page` is 1-based. Bounds are validated by [`query`], not here, so
    /// a malformed request is representable but always rejected.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            filter: None,
        }
    }

    /// Attaches a column/value substring filter.
    #[must_use]
    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(Filter::new(column, value));
        self
    }

    /// Returns the 1-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the filter, if any.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Returns the request for the page after this one, same size and
    /// filter.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            page_size: self.page_size,
            filter: self.filter.clone(),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// The matching records for the requested page, in source order. At
    /// most `page_size` entries; short or empty past the end of the
    /// matched set.
    pub records: Vec<Record>,
    /// The number of records matching the filter across all pages (the
    /// dataset size when unfiltered). NOT the size of this page.
    pub total_count: usize,
}

/// Runs a page request against a dataset.
///
/// Records are filtered in source order, then sliced to
/// `[(page-1)*page_size, page*page_size)`. A page past the end of the
/// matched set yields a short or empty result, not an error.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] when `page` or `page_size` is zero,
/// and [`Error::ColumnNotFound`] when the filter names an unknown
/// column.
///
/// # Example
///
/// ```
/// use hojear::{query, Dataset, PageRequest};
///
/// let dataset = Dataset::from_json_str(
///     r#"[{"entity_type": "CARRIER"}, {"entity_type": "BROKER"}]"#,
/// ).unwrap();
///
/// let request = PageRequest::new(1, 10).with_filter("entity_type", "carrier");
/// let result = query(&dataset, &request).unwrap();
/// assert_eq!(result.total_count, 1);
/// ```
pub fn query(dataset: &Dataset, request: &PageRequest) -> Result<PageResult> {
    if request.page == 0 {
        return Err(Error::invalid_request("page must be >= 1"));
    }
    if request.page_size == 0 {
        return Err(Error::invalid_request("page size must be >= 1"));
    }

    if let Some(filter) = &request.filter {
        if !dataset.has_column(&filter.column) {
            return Err(Error::column_not_found(&filter.column));
        }
    }

    let needle_lower = request
        .filter
        .as_ref()
        .map(|f| f.value.to_lowercase())
        .unwrap_or_default();

    let matches: Vec<&Record> = dataset
        .iter()
        .filter(|record| match &request.filter {
            Some(filter) => filter.matches(record, &needle_lower),
            None => true,
        })
        .collect();

    let total_count = matches.len();
    let start = (request.page - 1).saturating_mul(request.page_size);
    let records = matches
        .into_iter()
        .skip(start)
        .take(request.page_size)
        .cloned()
        .collect();

    Ok(PageResult {
        records,
        total_count,
    })
}

/// Returns the number of pages needed to cover `total_count` matches at
/// `page_size` records per page.
///
/// Zero matches yield zero pages. A `page_size` of zero also yields zero
/// pages rather than dividing by zero; callers validate page sizes
/// through [`query`].
pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}
