//! Shop location snapshot synchronization.
//!
//! Catalog entries carry a denormalized copy of their shop's location. This
//! module keeps those copies fresh: a [`ShopDirectory`] is the source of truth
//! and [`SnapshotSyncer`] periodically copies its answers into the catalog
//! store. Search never waits on any of this; it reads whatever snapshot is
//! current and can flag old ones through a [`StalenessPolicy`].

mod directory;
mod staleness;
mod syncer;

pub use directory::HttpShopDirectory;
pub use staleness::StalenessPolicy;
pub use syncer::{next_delay, SnapshotSyncer, SyncReport, SyncStatus};

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::{CatalogError, ShopLocation};

/// Errors from the shop directory.
#[derive(Debug, Error)]
pub enum ShopDirectoryError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with an unexpected status.
    #[error("Shop directory unavailable: {status} - {message}")]
    Unavailable { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse shop directory response: {0}")]
    Parse(String),

    /// Client could not be built from configuration.
    #[error("Shop directory not configured: {0}")]
    NotConfigured(String),
}

/// Errors for a synchronization round.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Every shop lookup in the round failed.
    #[error("shop directory unreachable: {failed} of {checked} lookups failed")]
    DirectoryUnavailable { checked: usize, failed: usize },
}

/// Source of truth for shop locations.
#[async_trait]
pub trait ShopDirectory: Send + Sync {
    /// Current location of a shop. `None` if the directory does not know it.
    async fn shop(&self, shop_id: i64) -> Result<Option<ShopLocation>, ShopDirectoryError>;

    /// Shops owned by a user, in directory order.
    ///
    /// `token` is the caller's bearer token, forwarded as-is.
    async fn shops_by_owner(
        &self,
        owner_id: i64,
        token: Option<&str>,
    ) -> Result<Vec<ShopLocation>, ShopDirectoryError>;
}
