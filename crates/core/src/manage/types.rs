//! Request and error types for catalog management.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::sync::ShopDirectoryError;

/// Longest accepted SKU.
pub const MAX_SKU_LEN: usize = 64;

/// Longest accepted product name.
pub const MAX_NAME_LEN: usize = 255;

/// Prices must stay below this (twelve digits, two of them decimals).
const PRICE_CEILING: i64 = 10_000_000_000;

/// Request to create a product in the caller's shop.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Generated when absent or blank.
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            sku: None,
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            price,
            category_id: None,
            available: true,
        }
    }

    /// Validate fields and return the explicit SKU, if any.
    pub(crate) fn validate(&self) -> Result<Option<String>, ManageError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;

        match self.sku.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(sku) if sku.chars().count() > MAX_SKU_LEN => Err(ManageError::InvalidInput(
                format!("sku must be at most {} characters", MAX_SKU_LEN),
            )),
            Some(sku) => Ok(Some(sku.to_string())),
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ManageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ManageError::InvalidInput("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ManageError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_price(price: Decimal) -> Result<(), ManageError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ManageError::InvalidInput("price must not be negative".to_string()));
    }
    if price.normalize().scale() > 2 {
        return Err(ManageError::InvalidInput(
            "price must have at most 2 decimal places".to_string(),
        ));
    }
    if price >= Decimal::from(PRICE_CEILING) {
        return Err(ManageError::InvalidInput(format!("price out of range: {}", price)));
    }
    Ok(())
}

/// Errors from management operations.
#[derive(Debug, Error)]
pub enum ManageError {
    /// Caller lacks the role or does not own the shop.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("catalog error: {0}")]
    Catalog(CatalogError),

    #[error("shop directory error: {0}")]
    ShopDirectory(#[from] ShopDirectoryError),
}

impl From<CatalogError> for ManageError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => ManageError::NotFound(msg),
            CatalogError::InvalidInput(msg) => ManageError::InvalidInput(msg),
            other => ManageError::Catalog(other),
        }
    }
}
