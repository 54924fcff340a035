use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::types::{validate_name, validate_price};
use super::{ManageError, NewProduct};
use crate::auth::AuthContext;
use crate::catalog::{
    CatalogEntry, CatalogEntryPatch, CatalogError, CatalogStore, NewCatalogEntry, ShopSnapshot,
};
use crate::sync::ShopDirectory;

const SKU_LEN: usize = 8;
const SKU_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SKU_ATTEMPTS: usize = 5;

/// Authorized writes to the catalog on behalf of shop owners.
pub struct CatalogManager {
    store: Arc<dyn CatalogStore>,
    directory: Arc<dyn ShopDirectory>,
}

impl CatalogManager {
    pub fn new(store: Arc<dyn CatalogStore>, directory: Arc<dyn ShopDirectory>) -> Self {
        Self { store, directory }
    }

    /// Create a product in the caller's first shop.
    ///
    /// The shop snapshot is taken from the directory at creation time.
    /// `token` is forwarded to the directory unchanged.
    pub async fn create(
        &self,
        ctx: &AuthContext,
        token: Option<&str>,
        product: NewProduct,
    ) -> Result<CatalogEntry, ManageError> {
        if !ctx.is_shop_owner() {
            return Err(ManageError::Forbidden(
                "Only shop owners can create products".to_string(),
            ));
        }
        let user_id = ctx
            .user_id
            .ok_or_else(|| ManageError::Forbidden("caller has no user id".to_string()))?;
        let explicit_sku = product.validate()?;

        let shops = self.directory.shops_by_owner(user_id, token).await?;
        let shop = shops
            .into_iter()
            .next()
            .ok_or_else(|| ManageError::Forbidden("No shop found for this owner".to_string()))?;

        let snapshot = ShopSnapshot {
            shop_id: shop.shop_id,
            shop_name: shop.name,
            latitude: shop.latitude,
            longitude: shop.longitude,
            synced_at: Some(shop.observed_at),
        };

        let mut new_entry = NewCatalogEntry {
            sku: String::new(),
            name: product.name.trim().to_string(),
            description: product.description,
            tags: product.tags,
            price: product.price,
            category_id: product.category_id,
            available: product.available,
            shop: snapshot,
        };

        let entry = match explicit_sku {
            Some(sku) => {
                new_entry.sku = sku;
                self.store.insert(new_entry)?
            }
            None => self.insert_with_generated_sku(new_entry)?,
        };

        info!(
            entry_id = entry.id,
            sku = %entry.sku,
            shop_id = entry.shop.shop_id,
            user_id,
            "Created catalog entry"
        );
        Ok(entry)
    }

    /// Update core fields of an entry the caller owns.
    pub fn update(
        &self,
        ctx: &AuthContext,
        id: i64,
        patch: &CatalogEntryPatch,
    ) -> Result<CatalogEntry, ManageError> {
        self.authorize(ctx, id)?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }

        let entry = self.store.update(id, patch)?;
        info!(entry_id = id, "Updated catalog entry");
        Ok(entry)
    }

    /// Hide an entry from search without deleting it.
    pub fn mark_unavailable(&self, ctx: &AuthContext, id: i64) -> Result<CatalogEntry, ManageError> {
        let patch = CatalogEntryPatch {
            available: Some(false),
            ..Default::default()
        };
        self.update(ctx, id, &patch)
    }

    pub fn delete(&self, ctx: &AuthContext, id: i64) -> Result<(), ManageError> {
        self.authorize(ctx, id)?;
        self.store.delete(id)?;
        info!(entry_id = id, "Deleted catalog entry");
        Ok(())
    }

    /// Check role and shop ownership before touching entry `id`.
    fn authorize(&self, ctx: &AuthContext, id: i64) -> Result<CatalogEntry, ManageError> {
        if !ctx.is_shop_owner() {
            return Err(ManageError::Forbidden(
                "Only shop owners can modify products".to_string(),
            ));
        }
        let entry = self.store.get(id)?;
        if !ctx.owns_shop(entry.shop.shop_id) {
            warn!(
                entry_id = id,
                shop_id = entry.shop.shop_id,
                user_id = ?ctx.user_id,
                "Rejected change to another shop's entry"
            );
            return Err(ManageError::Forbidden(
                "You can't modify products of other shops.".to_string(),
            ));
        }
        Ok(entry)
    }

    fn insert_with_generated_sku(
        &self,
        mut entry: NewCatalogEntry,
    ) -> Result<CatalogEntry, ManageError> {
        for _ in 0..SKU_ATTEMPTS {
            entry.sku = generate_sku();
            match self.store.insert(entry.clone()) {
                Err(CatalogError::Conflict(msg)) => {
                    warn!(sku = %entry.sku, "Generated SKU collided: {}", msg);
                }
                result => return Ok(result?),
            }
        }
        Err(ManageError::Catalog(CatalogError::Conflict(format!(
            "no free SKU after {} attempts",
            SKU_ATTEMPTS
        ))))
    }
}

/// Bytes at or above this are discarded so every symbol is equally likely.
const SKU_BYTE_LIMIT: u8 = (256 / SKU_ALPHABET.len() * SKU_ALPHABET.len()) as u8;

/// Symbols drawn from the random bytes of a v4 UUID. Byte 6 carries the
/// version and byte 8 the variant, so both are skipped.
fn sku_symbols(id: Uuid) -> impl Iterator<Item = char> {
    let bytes = *id.as_bytes();
    bytes
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != 6 && *i != 8)
        .map(|(_, b)| b)
        .filter(|b| *b < SKU_BYTE_LIMIT)
        .map(|b| SKU_ALPHABET[b as usize % SKU_ALPHABET.len()] as char)
}

/// Random 8-character SKU over `[A-Z0-9]`.
pub fn generate_sku() -> String {
    let mut sku = String::with_capacity(SKU_LEN);
    while sku.len() < SKU_LEN {
        let missing = SKU_LEN - sku.len();
        sku.extend(sku_symbols(Uuid::new_v4()).take(missing));
    }
    sku
}
