//! Product catalog: entries with denormalized shop location snapshots.
//!
//! The store is the only writer. Search reads candidates through
//! [`CatalogStore::candidates`]; snapshot synchronization writes through
//! [`CatalogStore::apply_shop_snapshot`].

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Return entries matching the attribute filter, text needle and
    /// bounding box of the query.
    ///
    /// Implementations may return extra entries (the box is an
    /// over-approximation anyway) but must never drop a match.
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Get an entry by id.
    fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError>;

    /// Get an entry by SKU.
    fn get_by_sku(&self, sku: &str) -> Result<CatalogEntry, CatalogError>;

    /// Insert a new entry. Fails with `Conflict` on a duplicate SKU.
    fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError>;

    /// Apply a patch to the core fields of an entry and bump `updated_at`.
    fn update(&self, id: i64, patch: &CatalogEntryPatch) -> Result<CatalogEntry, CatalogError>;

    /// Remove an entry.
    fn delete(&self, id: i64) -> Result<(), CatalogError>;

    /// Overwrite the shop snapshot of every entry belonging to the shop.
    ///
    /// Entries whose snapshot is newer than `location.observed_at` are left
    /// untouched. Returns the number of entries updated.
    fn apply_shop_snapshot(&self, location: &ShopLocation) -> Result<u64, CatalogError>;

    /// Distinct shop ids referenced by the catalog.
    fn shop_ids(&self) -> Result<Vec<i64>, CatalogError>;

    /// List categories ordered by name.
    fn categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Create a category. Fails with `Conflict` on a duplicate name or slug.
    fn insert_category(&self, name: &str, slug: &str) -> Result<Category, CatalogError>;

    /// Get catalog statistics.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
