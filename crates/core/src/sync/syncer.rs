//! Background poller that copies shop locations into the catalog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{ShopDirectory, SyncError};
use crate::catalog::{CatalogError, CatalogStore};
use crate::config::SyncConfig;
use crate::metrics;

/// Outcome of one synchronization round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Shops referenced by the catalog at the start of the round.
    pub shops_checked: usize,
    /// Shops whose location was fetched and applied.
    pub shops_synced: usize,
    /// Shops the directory no longer knows. Their snapshots are kept.
    pub shops_missing: usize,
    /// Shops whose lookup or update failed.
    pub shops_failed: usize,
    /// Catalog entries overwritten.
    pub entries_updated: u64,
}

/// Current state of the syncer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_report: Option<SyncReport>,
}

/// Keeps catalog shop snapshots in line with the shop directory.
///
/// Rounds run every `interval_secs`. After a failed round the next one is
/// delayed by an exponential backoff instead.
pub struct SnapshotSyncer {
    config: SyncConfig,
    store: Arc<dyn CatalogStore>,
    directory: Arc<dyn ShopDirectory>,

    // Runtime state
    running: Arc<AtomicBool>,
    status: Arc<RwLock<SyncStatus>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SnapshotSyncer {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn CatalogStore>,
        directory: Arc<dyn ShopDirectory>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            directory,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(SyncStatus::default())),
            shutdown_tx,
        }
    }

    /// Start the background loop. The first round runs immediately.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Snapshot syncer already running");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            "Starting shop snapshot syncer"
        );

        let running = Arc::clone(&self.running);
        let store = Arc::clone(&self.store);
        let directory = Arc::clone(&self.directory);
        let status = Arc::clone(&self.status);
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Snapshot sync loop started");
            let mut delay = Duration::ZERO;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Snapshot sync loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = Self::run_round(&store, &directory, &status).await {
                            warn!("Snapshot sync round failed: {}", e);
                        }
                        let failures = status.read().await.consecutive_failures;
                        delay = next_delay(&config, failures);
                        debug!(delay_secs = delay.as_secs_f64(), "Next snapshot sync scheduled");
                    }
                }
            }
            info!("Snapshot sync loop stopped");
        });
    }

    /// Stop the background loop.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Snapshot syncer not running");
            return;
        }

        info!("Stopping shop snapshot syncer");
        let _ = self.shutdown_tx.send(());
    }

    /// Run a single round now, outside the schedule.
    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        Self::run_round(&self.store, &self.directory, &self.status).await
    }

    pub async fn status(&self) -> SyncStatus {
        let mut status = self.status.read().await.clone();
        status.running = self.running.load(Ordering::Relaxed);
        status
    }

    async fn run_round(
        store: &Arc<dyn CatalogStore>,
        directory: &Arc<dyn ShopDirectory>,
        status: &Arc<RwLock<SyncStatus>>,
    ) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let result = Self::sync_all(store, directory).await;

        let mut status = status.write().await;
        status.last_run_at = Some(started_at);
        match &result {
            Ok(report) => {
                let label = if report.shops_failed > 0 { "partial" } else { "ok" };
                metrics::SNAPSHOT_SYNC_RUNS.with_label_values(&[label]).inc();
                status.last_success_at = Some(started_at);
                status.last_error = None;
                status.consecutive_failures = 0;
                status.last_report = Some(report.clone());
                info!(
                    shops = report.shops_checked,
                    synced = report.shops_synced,
                    missing = report.shops_missing,
                    failed = report.shops_failed,
                    entries_updated = report.entries_updated,
                    "Snapshot sync round completed"
                );
            }
            Err(e) => {
                metrics::SNAPSHOT_SYNC_RUNS
                    .with_label_values(&["failed"])
                    .inc();
                status.last_error = Some(e.to_string());
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            }
        }

        result
    }

    async fn sync_all(
        store: &Arc<dyn CatalogStore>,
        directory: &Arc<dyn ShopDirectory>,
    ) -> Result<SyncReport, SyncError> {
        let shop_ids = store.shop_ids()?;
        let mut report = SyncReport {
            shops_checked: shop_ids.len(),
            ..Default::default()
        };

        for shop_id in shop_ids {
            let location = match directory.shop(shop_id).await {
                Ok(Some(location)) => location,
                Ok(None) => {
                    debug!(shop_id, "Shop not found in directory, keeping snapshot");
                    report.shops_missing += 1;
                    continue;
                }
                Err(e) => {
                    warn!(shop_id, error = %e, "Shop directory lookup failed");
                    report.shops_failed += 1;
                    continue;
                }
            };

            if location.shop_id != shop_id {
                warn!(
                    shop_id,
                    returned = location.shop_id,
                    "Shop directory returned a different shop, skipping"
                );
                report.shops_failed += 1;
                continue;
            }

            match store.apply_shop_snapshot(&location) {
                Ok(updated) => {
                    report.shops_synced += 1;
                    report.entries_updated += updated;
                    metrics::SNAPSHOT_ENTRIES_UPDATED.inc_by(updated);
                }
                Err(CatalogError::InvalidInput(msg)) => {
                    warn!(shop_id, "Rejected shop location: {}", msg);
                    report.shops_failed += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if report.shops_checked > 0 && report.shops_failed == report.shops_checked {
            return Err(SyncError::DirectoryUnavailable {
                checked: report.shops_checked,
                failed: report.shops_failed,
            });
        }

        Ok(report)
    }
}

/// Delay before the next round given the number of consecutive failures.
///
/// No failures means the regular interval. Otherwise
/// `initial_backoff * multiplier^(failures - 1)`, capped at `max_backoff`.
pub fn next_delay(config: &SyncConfig, consecutive_failures: u32) -> Duration {
    if consecutive_failures == 0 {
        return Duration::from_secs(config.interval_secs);
    }

    let exponent = (consecutive_failures - 1).min(63) as i32;
    let secs = config.initial_backoff_secs as f64 * config.backoff_multiplier.powi(exponent);
    let capped = secs.min(config.max_backoff_secs as f64);
    Duration::try_from_secs_f64(capped.max(0.0)).unwrap_or(Duration::MAX)
}
