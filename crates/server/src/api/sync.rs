//! Snapshot syncer API handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use productsvc_core::{SyncReport, SyncStatus};

use super::error::ApiError;
use crate::state::AppState;

fn not_configured() -> ApiError {
    ApiError::not_found("Snapshot sync is not configured")
}

/// GET /api/v1/sync/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<SyncStatus>, ApiError> {
    let syncer = state.syncer().ok_or_else(not_configured)?;
    Ok(Json(syncer.status().await))
}

/// POST /api/v1/sync/run
///
/// Run one synchronization round now and return its report.
pub async fn run_now(State(state): State<Arc<AppState>>) -> Result<Json<SyncReport>, ApiError> {
    let syncer = state.syncer().ok_or_else(not_configured)?;
    Ok(Json(syncer.sync_once().await?))
}
