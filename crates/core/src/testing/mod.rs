//! Testing utilities and mock implementations.
//!
//! This module provides in-memory implementations of the catalog store and
//! the shop directory, so search, sync and management can be exercised
//! without SQLite or a running shop service.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use productsvc_core::testing::{fixtures, MockCatalogStore};
//! use productsvc_core::{SearchEngine, SearchQuery};
//!
//! let store = Arc::new(MockCatalogStore::new());
//! store.add(fixtures::entry_at(1, "Sofa", 19.0760, 72.8777));
//!
//! let engine = SearchEngine::new(store.clone());
//! let page = engine.search(&SearchQuery::new().with_text("sofa"))?;
//! ```

mod mock_catalog_store;
mod mock_shop_directory;

pub use mock_catalog_store::MockCatalogStore;
pub use mock_shop_directory::{MockShopDirectory, RecordedOwnerLookup};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::catalog::{CatalogEntry, NewCatalogEntry, ShopLocation, ShopSnapshot};

    /// An available entry without coordinates. The shop id equals the entry id.
    pub fn entry(id: i64, name: &str) -> CatalogEntry {
        let now = Utc::now();
        CatalogEntry {
            id,
            sku: format!("SKU{:05}", id),
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            price: Decimal::new(49_900, 2), // 499.00
            category_id: None,
            available: true,
            shop: ShopSnapshot {
                shop_id: id,
                shop_name: format!("Shop {}", id),
                latitude: None,
                longitude: None,
                synced_at: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// An available entry whose shop is at `(lat, lng)`.
    pub fn entry_at(id: i64, name: &str, lat: f64, lng: f64) -> CatalogEntry {
        let mut entry = entry(id, name);
        entry.shop.latitude = Some(lat);
        entry.shop.longitude = Some(lng);
        entry
    }

    /// Insert data for an entry of `shop_id`, optionally located.
    pub fn new_entry(sku: &str, name: &str, shop_id: i64, coord: Option<(f64, f64)>) -> NewCatalogEntry {
        NewCatalogEntry {
            sku: sku.to_string(),
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            price: Decimal::new(10_000, 2), // 100.00
            category_id: None,
            available: true,
            shop: ShopSnapshot {
                shop_id,
                shop_name: format!("Shop {}", shop_id),
                latitude: coord.map(|c| c.0),
                longitude: coord.map(|c| c.1),
                synced_at: None,
            },
        }
    }

    /// A directory answer for a located shop, observed now.
    pub fn shop_location(shop_id: i64, lat: f64, lng: f64) -> ShopLocation {
        ShopLocation {
            shop_id,
            name: format!("Shop {}", shop_id),
            latitude: Some(lat),
            longitude: Some(lng),
            observed_at: Utc::now(),
        }
    }
}
