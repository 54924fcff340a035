use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{catalog, handlers, products, sync};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Authenticated API routes
    let protected_routes = Router::new()
        .route("/config", get(handlers::get_config))
        // Products
        .route("/products/search", get(products::search_products))
        .route("/products/{id}", get(products::get_product))
        // Catalog
        .route("/categories", get(catalog::list_categories))
        .route("/catalog/stats", get(catalog::get_stats))
        // Snapshot sync
        .route("/sync/status", get(sync::get_status))
        .route("/sync/run", post(sync::run_now))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
