//! Mock shop directory for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::ShopLocation;
use crate::sync::{ShopDirectory, ShopDirectoryError};

/// A recorded owner lookup for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOwnerLookup {
    pub owner_id: i64,
    pub token: Option<String>,
}

/// Mock implementation of the ShopDirectory trait.
///
/// # Example
///
/// ```rust,ignore
/// use productsvc_core::testing::{MockShopDirectory, fixtures};
///
/// let directory = MockShopDirectory::new();
/// directory.add_shop(fixtures::shop_location(3, 19.07, 72.87), Some(42)).await;
///
/// let shops = directory.shops_by_owner(42, Some("token")).await?;
/// assert_eq!(shops[0].shop_id, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockShopDirectory {
    shops: Arc<RwLock<HashMap<i64, ShopLocation>>>,
    /// Owner id to shop ids, in insertion order.
    owners: Arc<RwLock<HashMap<i64, Vec<i64>>>>,
    owner_lookups: Arc<RwLock<Vec<RecordedOwnerLookup>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockShopDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a shop, optionally owned by `owner_id`.
    pub async fn add_shop(&self, location: ShopLocation, owner_id: Option<i64>) {
        let shop_id = location.shop_id;
        self.shops.write().await.insert(shop_id, location);
        if let Some(owner_id) = owner_id {
            let mut owners = self.owners.write().await;
            let shops = owners.entry(owner_id).or_default();
            if !shops.contains(&shop_id) {
                shops.push(shop_id);
            }
        }
    }

    pub async fn remove_shop(&self, shop_id: i64) {
        self.shops.write().await.remove(&shop_id);
    }

    /// Make every subsequent call fail as if the service were down.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn owner_lookups(&self) -> Vec<RecordedOwnerLookup> {
        self.owner_lookups.read().await.clone()
    }

    async fn check(&self) -> Result<(), ShopDirectoryError> {
        if *self.fail.read().await {
            return Err(ShopDirectoryError::Unavailable {
                status: 503,
                message: "simulated shop service outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ShopDirectory for MockShopDirectory {
    async fn shop(&self, shop_id: i64) -> Result<Option<ShopLocation>, ShopDirectoryError> {
        self.check().await?;
        Ok(self.shops.read().await.get(&shop_id).cloned())
    }

    async fn shops_by_owner(
        &self,
        owner_id: i64,
        token: Option<&str>,
    ) -> Result<Vec<ShopLocation>, ShopDirectoryError> {
        self.owner_lookups.write().await.push(RecordedOwnerLookup {
            owner_id,
            token: token.map(str::to_string),
        });
        self.check().await?;

        let owners = self.owners.read().await;
        let shops = self.shops.read().await;
        Ok(owners
            .get(&owner_id)
            .map(|ids| ids.iter().filter_map(|id| shops.get(id).cloned()).collect())
            .unwrap_or_default())
    }
}
