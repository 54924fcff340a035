use serde::Serialize;
use serde_json::Value;

use super::Identity;

/// Role allowed to create and manage catalog entries.
pub const SHOP_OWNER_ROLE: &str = "shop_owner";

/// Authorization facts about the caller of a mutating operation.
///
/// Always passed explicitly; nothing reads the current request implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub role: Option<String>,
    pub user_id: Option<i64>,
    /// Shops the caller manages. Empty means "not stated".
    pub shop_ids: Vec<i64>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn shop_owner(user_id: i64, shop_ids: Vec<i64>) -> Self {
        Self {
            role: Some(SHOP_OWNER_ROLE.to_string()),
            user_id: Some(user_id),
            shop_ids,
        }
    }

    /// Derive the context from identity claims.
    ///
    /// `shop_ids` may be a single integer or a list; numeric strings are
    /// accepted. `user_id` falls back to the identity's user id.
    pub fn from_identity(identity: &Identity) -> Self {
        let role = identity
            .claim("role")
            .and_then(Value::as_str)
            .map(str::to_string);

        let user_id = identity
            .claim("user_id")
            .and_then(claim_as_i64)
            .or_else(|| identity.user_id.parse().ok());

        let shop_ids = match identity.claim("shop_ids") {
            Some(Value::Array(items)) => items.iter().filter_map(claim_as_i64).collect(),
            Some(single) => claim_as_i64(single).into_iter().collect(),
            None => Vec::new(),
        };

        Self {
            role,
            user_id,
            shop_ids,
        }
    }

    pub fn is_shop_owner(&self) -> bool {
        self.role.as_deref() == Some(SHOP_OWNER_ROLE)
    }

    /// Whether the caller may manage entries of `shop_id`.
    ///
    /// Checks the stated shop list; without one, a shop is owned when its id
    /// equals the caller's user id.
    pub fn owns_shop(&self, shop_id: i64) -> bool {
        if !self.shop_ids.is_empty() {
            return self.shop_ids.contains(&shop_id);
        }
        self.user_id == Some(shop_id)
    }
}

fn claim_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
