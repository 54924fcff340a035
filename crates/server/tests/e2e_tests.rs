//! End-to-end tests of the HTTP surface.
//!
//! These tests run the full router in-process over a temporary SQLite
//! catalog.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use productsvc_core::CatalogStore;
use serde_json::json;

use common::{fixtures, TestConfig, TestFixture, TEST_API_KEY};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["sync_enabled"], false);
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "none");
    assert_eq!(response.body["search"]["default_limit"], 50);
}

// =============================================================================
// Radius Search
// =============================================================================

#[tokio::test]
async fn test_radius_search_excludes_far_and_unlocated_entries() {
    let fixture = TestFixture::new().await;
    let a = fixture.insert(fixtures::new_entry("A", "Sofa A", 1, Some((19.0760, 72.8777))));
    fixture.insert(fixtures::new_entry("B", "Sofa B", 2, Some((19.2000, 72.9000))));
    fixture.insert(fixtures::new_entry("C", "Sofa C", 3, None));

    let response = fixture
        .get("/api/v1/products/search?lat=19.0760&lng=72.8777&radius_km=10")
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.ids(), vec![a.id]);
    assert_eq!(response.body[0]["distance_km"], json!(0.0));
    assert_eq!(response.total_count(), Some(1));
}

#[tokio::test]
async fn test_radius_search_orders_by_distance() {
    let fixture = TestFixture::new().await;
    let far = fixture.insert(fixtures::new_entry("FAR", "Lamp", 1, Some((19.2000, 72.9000))));
    let near = fixture.insert(fixtures::new_entry("NEAR", "Lamp", 2, Some((19.0800, 72.8800))));
    let here = fixture.insert(fixtures::new_entry("HERE", "Lamp", 3, Some((19.0760, 72.8777))));

    let response = fixture
        .get("/api/v1/products/search?lat=19.0760&lng=72.8777&radius_km=25&q=lamp")
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.ids(), vec![here.id, near.id, far.id]);

    let distances: Vec<f64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["distance_km"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(distances[2] > 10.0 && distances[2] < 20.0);
}

#[tokio::test]
async fn test_radius_search_across_antimeridian() {
    let fixture = TestFixture::new().await;
    let east = fixture.insert(fixtures::new_entry("E", "Kayak", 1, Some((0.0, 179.95))));
    let west = fixture.insert(fixtures::new_entry("W", "Kayak", 2, Some((0.0, -179.95))));
    fixture.insert(fixtures::new_entry("X", "Kayak", 3, Some((0.0, 178.0))));

    let response = fixture
        .get("/api/v1/products/search?lat=0&lng=179.99&radius_km=20")
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.ids(), vec![east.id, west.id]);
}

#[tokio::test]
async fn test_pagination_reports_total_before_paging() {
    let fixture = TestFixture::new().await;
    let mut ids = Vec::new();
    for i in 0..4 {
        let lat = 19.0760 + i as f64 * 0.01;
        let entry = fixture.insert(fixtures::new_entry(&format!("P{}", i), "Chair", i, Some((lat, 72.8777))));
        ids.push(entry.id);
    }

    let response = fixture
        .get("/api/v1/products/search?lat=19.0760&lng=72.8777&radius_km=50&limit=2&offset=1")
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.total_count(), Some(4));
    assert_eq!(response.ids(), vec![ids[1], ids[2]]);
}

// =============================================================================
// Text Search
// =============================================================================

#[tokio::test]
async fn test_text_search_has_no_distance() {
    let fixture = TestFixture::new().await;
    let sofa = fixture.insert(fixtures::new_entry("S1", "Leather Sofa", 1, Some((19.0, 72.8))));
    let mut bed = fixtures::new_entry("S2", "Guest bed", 2, None);
    bed.tags = vec!["SOFA-bed".to_string()];
    let bed = fixture.insert(bed);
    fixture.insert(fixtures::new_entry("T1", "Table", 3, None));

    let response = fixture.get("/api/v1/products/search?q=sofa").await;

    assert_status!(response, StatusCode::OK);
    let mut ids = response.ids();
    ids.sort();
    assert_eq!(ids, vec![sofa.id, bed.id]);
    for hit in response.body.as_array().unwrap() {
        assert!(hit.get("distance_km").is_none());
    }
}

#[tokio::test]
async fn test_search_excludes_unavailable_but_lookup_returns_it() {
    let fixture = TestFixture::new().await;
    let mut hidden = fixtures::new_entry("H1", "Hidden sofa", 1, None);
    hidden.available = false;
    let hidden = fixture.insert(hidden);

    let response = fixture.get("/api/v1/products/search?q=sofa").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.ids().is_empty());

    let response = fixture.get(&format!("/api/v1/products/{}", hidden.id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["available"], false);
}

#[tokio::test]
async fn test_entry_serialization() {
    let fixture = TestFixture::new().await;
    let entry = fixture.insert(fixtures::new_entry("SER1", "Desk", 7, Some((19.0, 72.8))));

    let response = fixture.get(&format!("/api/v1/products/{}", entry.id)).await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["sku"], "SER1");
    assert_eq!(response.body["price"], "100.00");
    assert_eq!(response.body["shop_id"], 7);
    assert_eq!(response.body["shop_lat"], json!(19.0));
    assert_eq!(response.body["shop_lng"], json!(72.8));
    assert!(response.body.get("snapshot_stale").is_none());
}

#[tokio::test]
async fn test_filters_and_ordering() {
    let fixture = TestFixture::new().await;
    let category = fixture.catalog.insert_category("Furniture", "furniture").unwrap();

    let mut cheap = fixtures::new_entry("F1", "Stool", 1, None);
    cheap.price = "15.00".parse().unwrap();
    cheap.category_id = Some(category.id);
    let cheap = fixture.insert(cheap);

    let mut pricey = fixtures::new_entry("F2", "Armchair", 2, None);
    pricey.price = "450.00".parse().unwrap();
    pricey.category_id = Some(category.id);
    let pricey = fixture.insert(pricey);

    fixture.insert(fixtures::new_entry("O1", "Poster", 3, None));

    let response = fixture
        .get(&format!(
            "/api/v1/products/search?category={}&ordering=-price",
            category.id
        ))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.ids(), vec![pricey.id, cheap.id]);

    let response = fixture
        .get("/api/v1/products/search?min_price=10&max_price=20")
        .await;
    assert_eq!(response.ids(), vec![cheap.id]);

    let response = fixture.get("/api/v1/products/search?sku=F2").await;
    assert_eq!(response.ids(), vec![pricey.id]);
}

// =============================================================================
// Invalid Queries
// =============================================================================

#[tokio::test]
async fn test_invalid_queries_return_400() {
    let fixture = TestFixture::new().await;

    for query in [
        "lat=19.0760&lng=72.8777&radius_km=0",
        "lat=100&lng=72.8&radius_km=5",
        "lat=19.0&radius_km=5",
        "lat=19.0&lng=72.8",
        "lat=north&lng=72.8&radius_km=5",
        "min_price=100&max_price=10",
        "ordering=distance",
        "limit=-1",
        "min_price=7922816251426433759354395033",
        "max_price=100000000000000000000",
        "q=a&q=b",
    ] {
        let response = fixture
            .get(&format!("/api/v1/products/search?{}", query))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "query: {}", query);
        assert_eq!(response.body["kind"], "invalid_query", "query: {}", query);
        assert!(response.body["error"].is_string());
    }
}

#[tokio::test]
async fn test_oversized_price_bound_is_a_client_error() {
    let fixture = TestFixture::new().await;
    fixture.insert(fixtures::new_entry("P1", "Sofa", 1, None));

    let response = fixture
        .get("/api/v1/products/search?q=sofa&max_price=100000000000000000000")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "invalid_query");

    let response = fixture.get("/api/v1/products/search?q=sofa").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.total_count(), Some(1));
}

#[tokio::test]
async fn test_non_numeric_product_id_returns_400() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/products/abc").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "invalid_query");
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_lookup_missing_entry_returns_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/products/999").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["kind"], "not_found");
}

// =============================================================================
// Staleness
// =============================================================================

#[tokio::test]
async fn test_stale_snapshots_are_flagged() {
    let fixture = TestFixture::with_config(TestConfig {
        max_snapshot_age: Some(Duration::from_secs(3600)),
        ..Default::default()
    })
    .await;
    let never = fixture.insert(fixtures::new_entry("N1", "Rug", 1, Some((19.0, 72.8))));
    let fresh = fixture.insert(fixtures::new_entry("N2", "Rug", 2, Some((19.0, 72.8))));
    fixture
        .catalog
        .apply_shop_snapshot(&fixtures::shop_location(2, 19.0, 72.8))
        .unwrap();

    let response = fixture.get("/api/v1/products/search?q=rug&ordering=updated_at").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.ids(), vec![never.id, fresh.id]);
    assert_eq!(response.body[0]["snapshot_stale"], true);
    assert_eq!(response.body[1]["snapshot_stale"], false);

    let response = fixture.get(&format!("/api/v1/products/{}", never.id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["snapshot_stale"], true);
    assert!(response.body.get("distance_km").is_none());
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_categories_and_stats() {
    let fixture = TestFixture::new().await;
    fixture.catalog.insert_category("Lighting", "lighting").unwrap();
    fixture.catalog.insert_category("Furniture", "furniture").unwrap();
    fixture.insert(fixtures::new_entry("ST1", "Lamp", 1, Some((19.0, 72.8))));
    fixture.insert(fixtures::new_entry("ST2", "Lamp", 1, None));

    let response = fixture.get("/api/v1/categories").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body[0]["slug"], "furniture");
    assert_eq!(response.body[1]["slug"], "lighting");

    let response = fixture.get("/api/v1/catalog/stats").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total_entries"], 2);
    assert_eq!(response.body["entries_with_coordinates"], 1);
    assert_eq!(response.body["distinct_shops"], 1);
}

#[tokio::test]
async fn test_sync_endpoints_without_syncer() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/sync/status").await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.post("/api/v1/sync/run").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

// =============================================================================
// Auth and Metrics
// =============================================================================

#[tokio::test]
async fn test_api_key_required_for_search() {
    let fixture = TestFixture::with_config(TestConfig::with_api_key()).await;

    let response = fixture.get("/api/v1/products/search?q=x").await;
    assert_status!(response, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["kind"], "unauthorized");

    let response = fixture
        .get_with_header("/api/v1/products/search?q=x", "X-API-Key", TEST_API_KEY)
        .await;
    assert_status!(response, StatusCode::OK);

    // Health stays public
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let request = axum::http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(fixture.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("productsvc_http_requests_total"));
    assert!(text.contains("productsvc_catalog_entries"));
}
