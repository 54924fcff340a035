//! Types for the product catalog.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{BoundingBox, Coordinate};

/// Separator placed between fields in the normalized search text so a
/// needle cannot match across a field boundary.
const SEARCH_TEXT_SEPARATOR: char = '\u{1f}';

/// A product listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable unique identifier.
    pub id: i64,
    /// Stock keeping unit, unique across the catalog.
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fixed-point price with two fractional digits.
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub available: bool,
    /// Denormalized copy of the shop's location at last sync.
    #[serde(flatten)]
    pub shop: ShopSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Case-insensitive substring match against name, description and tags.
    ///
    /// `needle` must already be lowercased (see [`normalize_needle`]).
    pub fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Shop fields copied onto each catalog entry.
///
/// Latitude and longitude are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSnapshot {
    pub shop_id: i64,
    pub shop_name: String,
    #[serde(rename = "shop_lat")]
    pub latitude: Option<f64>,
    #[serde(rename = "shop_lng")]
    pub longitude: Option<f64>,
    /// When the location was last refreshed from the shop directory.
    #[serde(rename = "shop_synced_at", default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl ShopSnapshot {
    /// The snapshot location, if it holds a valid coordinate pair.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn has_partial_coordinate(&self) -> bool {
        self.latitude.is_some() != self.longitude.is_some()
    }
}

/// Authoritative shop location as reported by the shop directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopLocation {
    pub shop_id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// When the directory observed this state. Older observations never
    /// overwrite newer snapshots.
    pub observed_at: DateTime<Utc>,
}

impl ShopLocation {
    /// Check that the location is either a full valid pair or absent.
    pub fn validate(&self) -> Result<(), CatalogError> {
        match (self.latitude, self.longitude) {
            (None, None) => Ok(()),
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng)
                .map(|_| ())
                .map_err(|e| CatalogError::InvalidInput(e.to_string())),
            _ => Err(CatalogError::InvalidInput(format!(
                "shop {} has only one coordinate component",
                self.shop_id
            ))),
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Data for inserting a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewCatalogEntry {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub available: bool,
    pub shop: ShopSnapshot,
}

/// Partial update of an entry's core fields.
///
/// Shop snapshot fields are owned by the synchronization process and
/// cannot be changed through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<Option<i64>>,
    #[serde(default)]
    pub available: Option<bool>,
}

impl CatalogEntryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.available.is_none()
    }

    /// Apply the patch to an entry in place.
    pub fn apply(&self, entry: &mut CatalogEntry) {
        if let Some(ref name) = self.name {
            entry.name = name.clone();
        }
        if let Some(ref description) = self.description {
            entry.description = description.clone();
        }
        if let Some(ref tags) = self.tags {
            entry.tags = tags.clone();
        }
        if let Some(price) = self.price {
            entry.price = price;
        }
        if let Some(category_id) = self.category_id {
            entry.category_id = category_id;
        }
        if let Some(available) = self.available {
            entry.available = available;
        }
    }
}

/// Cheap attribute filters applied before any text or distance work.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub category_id: Option<i64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sku: Option<String>,
    /// Only return entries marked available.
    pub available_only: bool,
}

impl Default for AttributeFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            min_price: None,
            max_price: None,
            sku: None,
            available_only: true,
        }
    }
}

impl AttributeFilter {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if self.available_only && !entry.available {
            return false;
        }
        if let Some(category_id) = self.category_id {
            if entry.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if entry.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if entry.price > max {
                return false;
            }
        }
        if let Some(ref sku) = self.sku {
            if &entry.sku != sku {
                return false;
            }
        }
        true
    }
}

/// What the search engine asks the store for.
///
/// Every predicate here may over-approximate: the engine re-checks text and
/// exact distance on whatever the store returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateQuery {
    pub filter: AttributeFilter,
    /// Lowercased text needle.
    pub text: Option<String>,
    /// Only entries with a coordinate inside this box.
    pub bbox: Option<BoundingBox>,
}

impl CandidateQuery {
    /// Whether an entry satisfies every predicate of the query.
    pub fn admits(&self, entry: &CatalogEntry) -> bool {
        if !self.filter.matches(entry) {
            return false;
        }
        if let Some(ref needle) = self.text {
            if !entry.matches_text(needle) {
                return false;
            }
        }
        if let Some(ref bbox) = self.bbox {
            match entry.shop.coordinate() {
                Some(coordinate) => bbox.contains(coordinate),
                None => false,
            }
        } else {
            true
        }
    }
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_entries: u64,
    pub available_entries: u64,
    pub entries_with_coordinates: u64,
    pub distinct_shops: u64,
    /// Entries whose snapshot was never refreshed by the syncer.
    pub never_synced_entries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_snapshot: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lowercase and trim a text query. Blank input yields `None`.
pub fn normalize_needle(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Build the lowercased text the store indexes for substring matching.
pub fn search_text(name: &str, description: &str, tags: &[String]) -> String {
    let mut text = String::with_capacity(name.len() + description.len() + 16);
    text.push_str(&name.to_lowercase());
    text.push(SEARCH_TEXT_SEPARATOR);
    text.push_str(&description.to_lowercase());
    for tag in tags {
        text.push(SEARCH_TEXT_SEPARATOR);
        text.push_str(&tag.to_lowercase());
    }
    text
}

/// Convert a price to integer minor units (cents).
pub fn price_to_minor(price: Decimal) -> Result<i64, CatalogError> {
    price
        .round_dp(2)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| CatalogError::InvalidInput(format!("price out of range: {}", price)))
}

/// Smallest minor-unit amount not below a lower price bound, if representable.
pub fn min_bound_minor(price: Decimal) -> Option<i64> {
    price.checked_mul(Decimal::ONE_HUNDRED)?.ceil().to_i64()
}

/// Largest minor-unit amount not above an upper price bound, if representable.
pub fn max_bound_minor(price: Decimal) -> Option<i64> {
    price.checked_mul(Decimal::ONE_HUNDRED)?.floor().to_i64()
}

/// Convert integer minor units back to a two-digit decimal price.
pub fn price_from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
