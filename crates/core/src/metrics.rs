//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search (requests, candidate set sizes, result sizes, latency)
//! - Snapshot synchronization (rounds, updated entries, directory errors)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Search requests by kind and result.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("productsvc_search_requests_total", "Total search requests"),
        &["kind", "result"], // kind: "radius", "text"; result: "ok", "invalid", "unavailable"
    )
    .unwrap()
});

/// Candidates returned by the store before exact filtering.
pub static SEARCH_CANDIDATES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "productsvc_search_candidates",
            "Number of store candidates examined per search",
        )
        .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
        &["kind"],
    )
    .unwrap()
});

/// Matches per search, before pagination.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "productsvc_search_results",
            "Number of matching entries per search before pagination",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
        &["kind"],
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "productsvc_search_duration_seconds",
            "Duration of catalog searches",
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Snapshot Sync Metrics
// =============================================================================

/// Sync rounds by result.
pub static SNAPSHOT_SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "productsvc_snapshot_sync_runs_total",
            "Total shop snapshot sync rounds",
        ),
        &["result"], // "ok", "partial", "failed"
    )
    .unwrap()
});

/// Catalog entries whose snapshot was overwritten.
pub static SNAPSHOT_ENTRIES_UPDATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "productsvc_snapshot_entries_updated_total",
        "Total catalog entries refreshed from the shop directory",
    )
    .unwrap()
});

/// Shop directory lookups that failed.
pub static SHOP_DIRECTORY_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "productsvc_shop_directory_errors_total",
            "Total failed shop directory requests",
        ),
        &["operation"], // "shop", "shops_by_owner"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCH_REQUESTS.clone()),
        Box::new(SEARCH_CANDIDATES.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(SEARCH_DURATION.clone()),
        // Sync
        Box::new(SNAPSHOT_SYNC_RUNS.clone()),
        Box::new(SNAPSHOT_ENTRIES_UPDATED.clone()),
        Box::new(SHOP_DIRECTORY_ERRORS.clone()),
    ]
}
