//! Common test utilities for E2E testing.
//!
//! This module provides a test fixture that creates an in-process server
//! over a temporary SQLite catalog, so the HTTP surface can be exercised
//! without binding a port or running the shop service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use productsvc_core::config::{
    ApiKeyConfig, AuthConfig, AuthMethod, Config, DatabaseConfig, SearchConfig, ServerConfig,
};
use productsvc_core::{
    create_authenticator, Authenticator, CatalogEntry, CatalogStore, SearchEngine, SqliteCatalog,
    StalenessPolicy,
};

/// Re-export fixtures for test convenience
pub use productsvc_core::testing::fixtures;

/// API key accepted when [`TestConfig::api_key`] is set.
pub const TEST_API_KEY: &str = "test-key";

/// Test fixture for E2E testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     fixture.insert(fixtures::new_entry("SKU1", "Sofa", 1, Some((19.07, 72.87))));
///
///     let response = fixture.get("/api/v1/products/search?q=sofa").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The catalog behind the router - seed entries here
    pub catalog: Arc<SqliteCatalog>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of `X-Total-Count`, if present.
    pub fn total_count(&self) -> Option<usize> {
        self.headers
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Ids of a JSON array of entries, in order.
    pub fn ids(&self) -> Vec<i64> {
        self.body
            .as_array()
            .map(|items| items.iter().filter_map(|i| i["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}

impl TestFixture {
    /// Create a new test fixture with auth disabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = match test_config.api_key {
            true => AuthConfig {
                method: AuthMethod::ApiKey,
                api_keys: vec![ApiKeyConfig {
                    key: TEST_API_KEY.to_string(),
                    user_id: 1,
                    role: "customer".to_string(),
                    shop_ids: vec![],
                }],
            },
            false => AuthConfig {
                method: AuthMethod::None,
                api_keys: vec![],
            },
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            search: test_config.search.clone(),
            sync: None,
        };

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );
        let catalog = Arc::new(SqliteCatalog::new(&db_path).expect("Failed to create catalog"));

        let mut engine = SearchEngine::new(Arc::clone(&catalog) as Arc<dyn CatalogStore>);
        if let Some(max_age) = test_config.max_snapshot_age {
            engine = engine.with_staleness(StalenessPolicy::new(max_age));
        }

        let state = Arc::new(productsvc_server::state::AppState::new(
            config,
            authenticator,
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            engine,
            None,
        ));

        let router = productsvc_server::api::create_router(state);

        Self {
            router,
            catalog,
            temp_dir,
        }
    }

    /// Insert an entry into the catalog.
    pub fn insert(&self, entry: productsvc_core::catalog::NewCatalogEntry) -> CatalogEntry {
        self.catalog.insert(entry).expect("Failed to insert entry")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request with an extra header.
    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        self.request("GET", path, Some((name, value))).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, header: Option<(&str, &str)>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some((name, value)) = header {
            request_builder = request_builder.header(name, value);
        }
        let request = request_builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require [`TEST_API_KEY`] on protected routes
    pub api_key: bool,
    /// Search limits
    pub search: SearchConfig,
    /// Flag snapshots older than this as stale
    pub max_snapshot_age: Option<Duration>,
}

impl TestConfig {
    /// Create config with API key auth enabled.
    pub fn with_api_key() -> Self {
        Self {
            api_key: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
