//! In-memory catalog store for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::catalog::{
    CandidateQuery, CatalogEntry, CatalogEntryPatch, CatalogError, CatalogStats, CatalogStore,
    Category, NewCatalogEntry, ShopLocation,
};

/// Mock implementation of the CatalogStore trait.
///
/// Provides controllable behavior for testing:
/// - Seed entries directly with [`MockCatalogStore::add`]
/// - Inspect the last candidate query the engine issued
/// - Simulate an unreachable store with [`MockCatalogStore::set_fail`]
///
/// Candidate queries are answered exactly (no over-approximation), in
/// insertion order.
#[derive(Debug, Default)]
pub struct MockCatalogStore {
    entries: RwLock<Vec<CatalogEntry>>,
    categories: RwLock<Vec<Category>>,
    last_query: RwLock<Option<CandidateQuery>>,
    fail: AtomicBool,
}

impl MockCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any entry with the same id.
    pub fn add(&self, entry: CatalogEntry) {
        let mut entries = write(&self.entries);
        entries.retain(|e| e.id != entry.id);
        entries.push(entry);
    }

    /// All stored entries in insertion order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        read(&self.entries).clone()
    }

    /// The most recent query passed to `candidates`.
    pub fn last_query(&self) -> Option<CandidateQuery> {
        read(&self.last_query).clone()
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CatalogError::Database("simulated store failure".to_string()));
        }
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl CatalogStore for MockCatalogStore {
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        *write(&self.last_query) = Some(query.clone());
        self.check()?;
        Ok(read(&self.entries)
            .iter()
            .filter(|e| query.admits(e))
            .cloned()
            .collect())
    }

    fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError> {
        self.check()?;
        read(&self.entries)
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("catalog entry {}", id)))
    }

    fn get_by_sku(&self, sku: &str) -> Result<CatalogEntry, CatalogError> {
        self.check()?;
        read(&self.entries)
            .iter()
            .find(|e| e.sku == sku)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("sku {}", sku)))
    }

    fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError> {
        self.check()?;
        if entry.shop.has_partial_coordinate() {
            return Err(CatalogError::InvalidInput(
                "shop snapshot has only one coordinate component".to_string(),
            ));
        }

        let mut entries = write(&self.entries);
        if entries.iter().any(|e| e.sku == entry.sku) {
            return Err(CatalogError::Conflict(format!("sku {} already exists", entry.sku)));
        }

        let now = Utc::now();
        let created = CatalogEntry {
            id: entries.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            sku: entry.sku,
            name: entry.name,
            description: entry.description,
            tags: entry.tags,
            price: entry.price.round_dp(2),
            category_id: entry.category_id,
            available: entry.available,
            shop: entry.shop,
            created_at: now,
            updated_at: now,
        };
        entries.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: i64, patch: &CatalogEntryPatch) -> Result<CatalogEntry, CatalogError> {
        self.check()?;
        let mut entries = write(&self.entries);
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CatalogError::NotFound(format!("catalog entry {}", id)))?;
        patch.apply(entry);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn delete(&self, id: i64) -> Result<(), CatalogError> {
        self.check()?;
        let mut entries = write(&self.entries);
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(CatalogError::NotFound(format!("catalog entry {}", id)));
        }
        Ok(())
    }

    fn apply_shop_snapshot(&self, location: &ShopLocation) -> Result<u64, CatalogError> {
        self.check()?;
        location.validate()?;

        let mut updated = 0;
        for entry in write(&self.entries).iter_mut() {
            if entry.shop.shop_id != location.shop_id {
                continue;
            }
            if matches!(entry.shop.synced_at, Some(t) if t > location.observed_at) {
                continue;
            }
            entry.shop.shop_name = location.name.clone();
            entry.shop.latitude = location.latitude;
            entry.shop.longitude = location.longitude;
            entry.shop.synced_at = Some(location.observed_at);
            updated += 1;
        }
        Ok(updated)
    }

    fn shop_ids(&self) -> Result<Vec<i64>, CatalogError> {
        self.check()?;
        let mut ids: Vec<i64> = read(&self.entries).iter().map(|e| e.shop.shop_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.check()?;
        let mut categories = read(&self.categories).clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn insert_category(&self, name: &str, slug: &str) -> Result<Category, CatalogError> {
        self.check()?;
        let mut categories = write(&self.categories);
        if categories.iter().any(|c| c.name == name || c.slug == slug) {
            return Err(CatalogError::Conflict(format!("category {} already exists", name)));
        }
        let category = Category {
            id: categories.len() as i64 + 1,
            name: name.to_string(),
            slug: slug.to_string(),
        };
        categories.push(category.clone());
        Ok(category)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        self.check()?;
        let entries = read(&self.entries);
        let mut shops: Vec<i64> = entries.iter().map(|e| e.shop.shop_id).collect();
        shops.sort_unstable();
        shops.dedup();
        let oldest_snapshot: Option<DateTime<Utc>> =
            entries.iter().filter_map(|e| e.shop.synced_at).min();

        Ok(CatalogStats {
            total_entries: entries.len() as u64,
            available_entries: entries.iter().filter(|e| e.available).count() as u64,
            entries_with_coordinates: entries
                .iter()
                .filter(|e| e.shop.latitude.is_some())
                .count() as u64,
            distinct_shops: shops.len() as u64,
            never_synced_entries: entries
                .iter()
                .filter(|e| e.shop.synced_at.is_none())
                .count() as u64,
            oldest_snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_add_replaces_same_id() {
        let store = MockCatalogStore::new();
        store.add(fixtures::entry(1, "First"));
        store.add(fixtures::entry(1, "Second"));
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.get(1).unwrap().name, "Second");
    }

    #[test]
    fn test_failure_flag() {
        let store = MockCatalogStore::new();
        store.add(fixtures::entry(1, "A"));
        store.set_fail(true);
        assert!(matches!(store.get(1), Err(CatalogError::Database(_))));
        store.set_fail(false);
        assert!(store.get(1).is_ok());
    }

    #[test]
    fn test_older_snapshot_is_ignored() {
        let store = MockCatalogStore::new();
        let mut e = fixtures::entry(1, "A");
        e.shop.synced_at = Some(Utc::now());
        let shop_id = e.shop.shop_id;
        store.add(e);

        let mut old = fixtures::shop_location(shop_id, 1.0, 1.0);
        old.observed_at = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.apply_shop_snapshot(&old).unwrap(), 0);

        let fresh = fixtures::shop_location(shop_id, 1.0, 1.0);
        assert_eq!(store.apply_shop_snapshot(&fresh).unwrap(), 1);
        assert_eq!(store.get(1).unwrap().shop.latitude, Some(1.0));
    }
}
