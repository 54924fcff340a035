//! Product search API handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderName, HeaderValue},
    response::IntoResponse,
    Json,
};
use productsvc_core::{metrics, SearchHit, SearchParams};
use tracing::debug;

use super::error::ApiError;
use crate::state::AppState;

/// Header carrying the match count before pagination.
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

/// GET /api/v1/products/search
///
/// Returns a JSON array of hits. Radius searches add `distance_km` to each
/// hit and order nearest first.
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.inspect_err(|e| {
        debug!("Rejected search parameters: {}", e);
        metrics::SEARCH_REQUESTS
            .with_label_values(&["text", "invalid"])
            .inc();
    })?;
    let kind = params.kind();
    let query = params
        .into_query(&state.config().search)
        .inspect_err(|e| {
            debug!(kind, "Rejected search: {}", e);
            metrics::SEARCH_REQUESTS
                .with_label_values(&[kind, "invalid"])
                .inc();
        })?;

    let page = state.engine().search(&query)?;

    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(page.total));
    Ok((headers, Json(page.hits)))
}

/// GET /api/v1/products/{id}
///
/// Get a single catalog entry, including unavailable ones. Carries
/// `snapshot_stale` like search hits do, but never a distance.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SearchHit>, ApiError> {
    let Path(id) = id?;
    let engine = state.engine();
    let entry = engine.lookup(id)?;
    let snapshot_stale = engine.snapshot_stale(&entry);
    Ok(Json(SearchHit {
        entry,
        distance_km: None,
        exact_distance_km: None,
        snapshot_stale,
    }))
}
