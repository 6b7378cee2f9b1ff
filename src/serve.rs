//! HTTP binding for the record query engine.
//!
//! Serves the dataset over two GET routes:
//!
//! - `/records?page=&limit=&filterColumn=&filterValue=` — one page of
//!   records as a JSON array, with the post-filter match count in the
//!   `x-total-count` response header;
//! - `/records/{id}` — single-record detail lookup.
//!
//! Pages are served through a shared [`PageCache`], so the dataset is
//! filtered at most once per page/filter combination per process and
//! the following page is prefetched in the background.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::{
    cache::{DatasetQuery, PageCache},
    dataset::Dataset,
    error::{Error, Result},
    query::PageRequest,
    record::Record,
};

/// Response header carrying the post-filter match count.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Shared state behind the record routes.
#[derive(Clone)]
pub struct AppState {
    dataset: Arc<Dataset>,
    cache: PageCache,
}

impl AppState {
    /// Wraps a dataset with an empty page cache.
    pub fn new(dataset: Dataset) -> Self {
        let dataset = Arc::new(dataset);
        let cache = PageCache::new(DatasetQuery::new(Arc::clone(&dataset)));
        Self { dataset, cache }
    }

    /// Returns the page cache serving this state.
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }
}

/// Builds the record-serving router over a dataset.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/{id}", get(get_record))
        .with_state(state)
}

/// Binds `addr` and serves the record routes until shutdown.
///
/// # Errors
///
/// Returns an I/O error if binding or serving fails.
pub async fn run(dataset: Dataset, addr: SocketAddr) -> Result<()> {
    let rows = dataset.len();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(Error::io_no_path)?;
    tracing::info!(%addr, rows, "serving records");
    axum::serve(listener, router(AppState::new(dataset)))
        .await
        .map_err(Error::io_no_path)
}

/// Query parameters of `/records`, matching the grid client's wire
/// names.
#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
    #[serde(alias = "pageSize")]
    limit: Option<usize>,
    #[serde(rename = "filterColumn")]
    filter_column: Option<String>,
    #[serde(rename = "filterValue")]
    filter_value: Option<String>,
}

impl ListParams {
    /// A filter applies only when both column and value are present.
    fn to_request(&self) -> PageRequest {
        let request = PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        );
        match (&self.filter_column, &self.filter_value) {
            (Some(column), Some(value)) => request.with_filter(column, value),
            _ => request,
        }
    }
}

async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let request = params.to_request();
    let result = state.cache.fetch_page(&request)?;
    // Fire-and-forget warm-up of the next page; failures are logged
    // inside the cache.
    let _prefetch = state.cache.prefetch_next(&request);

    Ok((
        AppendHeaders([(TOTAL_COUNT_HEADER, result.total_count.to_string())]),
        Json(result.records),
    ))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> std::result::Result<Json<Record>, ApiError> {
    state
        .dataset
        .get_by_id(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no record with id {id}")))
}

/// Error kinds mapped to HTTP statuses: bad requests and unknown
/// columns are the client's fault, everything else is a 500.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match &error {
            Error::InvalidRequest { .. } | Error::ColumnNotFound { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
