//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the product service:
//! - HTTP request metrics (latency, counts, errors)
//! - Catalog size and snapshot freshness (collected dynamically)
//! - Snapshot syncer status (collected dynamically)
//!
//! Search and sync counters live in the core crate and are registered here.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "productsvc_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("productsvc_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "productsvc_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "productsvc_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Catalog entries.
pub static CATALOG_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("productsvc_catalog_entries", "Number of catalog entries").unwrap()
});

/// Entries whose shop snapshot has never been synchronized.
pub static CATALOG_NEVER_SYNCED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "productsvc_catalog_never_synced_entries",
        "Catalog entries whose shop snapshot was never synchronized",
    )
    .unwrap()
});

/// Age of the oldest shop snapshot in seconds.
pub static OLDEST_SNAPSHOT_AGE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "productsvc_oldest_snapshot_age_seconds",
        "Age of the oldest shop snapshot in the catalog",
    )
    .unwrap()
});

// =============================================================================
// Syncer Metrics (collected dynamically)
// =============================================================================

/// Syncer running state (1 = running, 0 = stopped).
pub static SYNCER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "productsvc_syncer_running",
        "Whether the snapshot syncer is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Consecutive failed sync rounds.
pub static SYNCER_CONSECUTIVE_FAILURES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "productsvc_syncer_consecutive_failures",
        "Consecutive failed snapshot sync rounds",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Catalog
    registry
        .register(Box::new(CATALOG_ENTRIES.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_NEVER_SYNCED.clone()))
        .unwrap();
    registry
        .register(Box::new(OLDEST_SNAPSHOT_AGE.clone()))
        .unwrap();

    // Syncer
    registry
        .register(Box::new(SYNCER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(SYNCER_CONSECUTIVE_FAILURES.clone()))
        .unwrap();

    // Core metrics (search, snapshot sync, shop directory)
    for metric in productsvc_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the catalog and syncer as they
/// are now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(stats) = state.catalog().stats() {
        CATALOG_ENTRIES.set(stats.total_entries as i64);
        CATALOG_NEVER_SYNCED.set(stats.never_synced_entries as i64);
        let age = stats
            .oldest_snapshot
            .map(|t| (chrono::Utc::now() - t).num_seconds().max(0))
            .unwrap_or(0);
        OLDEST_SNAPSHOT_AGE.set(age);
    }

    if let Some(syncer) = state.syncer() {
        let status = syncer.status().await;
        SYNCER_RUNNING.set(if status.running { 1 } else { 0 });
        SYNCER_CONSECUTIVE_FAILURES.set(status.consecutive_failures as i64);
    }
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Applied twice: adjacent numeric segments share a slash, so one pass
    // only replaces every other one.
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
