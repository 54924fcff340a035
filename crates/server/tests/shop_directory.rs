//! HTTP shop directory against a stub shop service.
//!
//! The stub is a small axum app bound to an ephemeral port. It serves
//! `GET /api/shops/{id}/` and `GET /api/shops/?owner_id=` in the shapes the
//! real service uses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use productsvc_core::config::SyncConfig;
use productsvc_core::testing::fixtures;
use productsvc_core::{
    CatalogStore, HttpShopDirectory, RadiusFilter, SearchEngine, SearchQuery, ShopDirectory,
    ShopDirectoryError, SnapshotSyncer, SqliteCatalog, SyncError,
};

#[derive(Default)]
struct StubShops {
    shops: Mutex<HashMap<i64, Value>>,
    owners: Mutex<HashMap<i64, Vec<i64>>>,
    seen_auth: Mutex<Vec<Option<String>>>,
    fail: AtomicBool,
}

impl StubShops {
    fn add(&self, shop: Value, owner_id: i64) {
        let id = shop["id"].as_i64().unwrap();
        self.shops.lock().unwrap().insert(id, shop);
        self.owners.lock().unwrap().entry(owner_id).or_default().push(id);
    }
}

async fn get_shop(State(stub): State<Arc<StubShops>>, Path(id): Path<i64>) -> Response {
    if stub.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    match stub.shops.lock().unwrap().get(&id) {
        Some(shop) => Json(shop.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_shops(
    State(stub): State<Arc<StubShops>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    stub.seen_auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    if stub.fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }

    let owner_id: i64 = params
        .get("owner_id")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let owners = stub.owners.lock().unwrap();
    let shops = stub.shops.lock().unwrap();
    let results: Vec<Value> = owners
        .get(&owner_id)
        .map(|ids| ids.iter().filter_map(|id| shops.get(id).cloned()).collect())
        .unwrap_or_default();

    // Paginated shape, as the service's list endpoint uses.
    Json(json!({ "count": results.len(), "results": results })).into_response()
}

/// Start the stub and return it with the base URL of its shop endpoint.
async fn start_stub() -> (Arc<StubShops>, String) {
    let stub = Arc::new(StubShops::default());
    let app = Router::new()
        .route("/api/shops/", get(list_shops))
        .route("/api/shops/{id}/", get(get_shop))
        .with_state(Arc::clone(&stub));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (stub, format!("http://{}/api/shops/", addr))
}

fn directory(base_url: &str) -> HttpShopDirectory {
    HttpShopDirectory::new(&SyncConfig::new(base_url)).unwrap()
}

#[tokio::test]
async fn test_shop_lookup_parses_decimal_strings() {
    let (stub, url) = start_stub().await;
    stub.add(
        json!({"id": 3, "name": "Mumbai Home", "latitude": "19.076000", "longitude": "72.877700"}),
        12,
    );
    stub.add(json!({"id": 4, "name": "No Pin", "latitude": null, "longitude": ""}), 12);

    let dir = directory(&url);
    let shop = dir.shop(3).await.unwrap().unwrap();
    assert_eq!(shop.name, "Mumbai Home");
    assert_eq!(shop.latitude, Some(19.076));
    assert_eq!(shop.longitude, Some(72.8777));

    let unpinned = dir.shop(4).await.unwrap().unwrap();
    assert_eq!(unpinned.latitude, None);
    assert_eq!(unpinned.longitude, None);

    assert!(dir.shop(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_owner_lookup_forwards_token() {
    let (stub, url) = start_stub().await;
    stub.add(json!({"id": 5, "name": "First", "latitude": 1.0, "longitude": 2.0}), 12);
    stub.add(json!({"id": 6, "name": "Second", "latitude": 3.0, "longitude": 4.0}), 12);

    let dir = directory(&url);
    let shops = dir.shops_by_owner(12, Some("jwt-token")).await.unwrap();
    let ids: Vec<i64> = shops.iter().map(|s| s.shop_id).collect();
    assert_eq!(ids, vec![5, 6]);

    assert!(dir.shops_by_owner(77, None).await.unwrap().is_empty());

    let seen = stub.seen_auth.lock().unwrap().clone();
    assert_eq!(seen, vec![Some("Bearer jwt-token".to_string()), None]);
}

#[tokio::test]
async fn test_service_errors_surface_as_unavailable() {
    let (stub, url) = start_stub().await;
    stub.fail.store(true, Ordering::SeqCst);

    let dir = directory(&url);
    match dir.shop(1).await {
        Err(ShopDirectoryError::Unavailable { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected Unavailable, got {:?}", other),
    }
    assert!(matches!(
        dir.shops_by_owner(1, None).await,
        Err(ShopDirectoryError::Unavailable { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_http_error() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let dir = directory(&format!("http://127.0.0.1:{}/api/shops/", port));
    assert!(matches!(dir.shop(1).await, Err(ShopDirectoryError::Http(_))));
}

#[tokio::test]
async fn test_sync_round_makes_entries_searchable() {
    let (stub, url) = start_stub().await;
    stub.add(
        json!({"id": 3, "name": "Moved Shop", "latitude": 19.0760, "longitude": 72.8777}),
        12,
    );

    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let entry = catalog
        .insert(fixtures::new_entry("SYNC1", "Sofa", 3, None))
        .unwrap();
    catalog
        .insert(fixtures::new_entry("SYNC2", "Sofa", 8, None))
        .unwrap();

    let store: Arc<dyn CatalogStore> = catalog.clone();
    let engine = SearchEngine::new(Arc::clone(&store));
    let query = SearchQuery::new().with_radius(
        RadiusFilter::new(productsvc_core::Coordinate::new(19.0760, 72.8777).unwrap(), 5.0)
            .unwrap(),
    );
    assert_eq!(engine.search(&query).unwrap().total, 0);

    let syncer = SnapshotSyncer::new(SyncConfig::new(&url), store, Arc::new(directory(&url)));
    let report = syncer.sync_once().await.unwrap();
    assert_eq!(report.shops_checked, 2);
    assert_eq!(report.shops_synced, 1);
    assert_eq!(report.shops_missing, 1);
    assert_eq!(report.entries_updated, 1);

    let page = engine.search(&query).unwrap();
    assert_eq!(page.ids(), vec![entry.id]);
    assert_eq!(page.hits[0].entry.shop.shop_name, "Moved Shop");
}

#[tokio::test]
async fn test_sync_round_fails_when_service_is_down() {
    let (stub, url) = start_stub().await;
    stub.fail.store(true, Ordering::SeqCst);

    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    catalog
        .insert(fixtures::new_entry("DOWN1", "Sofa", 3, Some((1.0, 1.0))))
        .unwrap();

    let syncer = SnapshotSyncer::new(SyncConfig::new(&url), catalog.clone(), Arc::new(directory(&url)));
    let result = syncer.sync_once().await;
    assert!(matches!(result, Err(SyncError::DirectoryUnavailable { .. })));

    let status = syncer.status().await;
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.is_some());
    // The old snapshot is kept.
    assert_eq!(catalog.get_by_sku("DOWN1").unwrap().shop.latitude, Some(1.0));
}
