//! Catalog API handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use productsvc_core::{CatalogStats, Category};

use super::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/categories
///
/// List categories ordered by name.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog().categories()?))
}

/// GET /api/v1/catalog/stats
///
/// Get catalog statistics.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<CatalogStats>, ApiError> {
    Ok(Json(state.catalog().stats()?))
}
