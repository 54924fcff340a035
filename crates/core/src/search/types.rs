//! Types for geo radius search.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{AttributeFilter, CatalogEntry, CatalogError};
use crate::geo::{Coordinate, GeoError};

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed or inconsistent parameters.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Single-entry lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The catalog store could not be queried. Retryable.
    #[error("Catalog unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl SearchError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidQuery(_) => "invalid_query",
            SearchError::NotFound(_) => "not_found",
            SearchError::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }
}

impl From<GeoError> for SearchError {
    fn from(e: GeoError) -> Self {
        SearchError::InvalidQuery(e.to_string())
    }
}

impl From<CatalogError> for SearchError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(what) => SearchError::NotFound(what),
            CatalogError::InvalidInput(msg) => SearchError::InvalidQuery(msg),
            other => SearchError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Ordering for queries without a radius. Radius queries always sort by
/// distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently updated first.
    #[default]
    Recent,
    /// Least recently updated first.
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Recent => "-updated_at",
            SortOrder::Oldest => "updated_at",
            SortOrder::PriceAsc => "price",
            SortOrder::PriceDesc => "-price",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-updated_at" => Ok(SortOrder::Recent),
            "updated_at" => Ok(SortOrder::Oldest),
            "price" => Ok(SortOrder::PriceAsc),
            "-price" => Ok(SortOrder::PriceDesc),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown ordering '{}', expected one of: -updated_at, updated_at, price, -price",
                other
            ))),
        }
    }
}

/// A validated search circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFilter {
    origin: Coordinate,
    radius_km: f64,
}

impl RadiusFilter {
    /// Fails with `InvalidQuery` unless `radius_km` is finite and positive.
    pub fn new(origin: Coordinate, radius_km: f64) -> Result<Self, SearchError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_km).into());
        }
        Ok(Self { origin, radius_km })
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }
}

/// A fully validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Lowercased text needle.
    pub text: Option<String>,
    pub radius: Option<RadiusFilter>,
    pub filter: AttributeFilter,
    pub ordering: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            radius: None,
            filter: AttributeFilter::default(),
            ordering: SortOrder::default(),
            limit: 50,
            offset: 0,
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match entries containing `text`, case-insensitively. Blank text is
    /// ignored.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = crate::catalog::normalize_needle(text);
        self
    }

    pub fn with_radius(mut self, radius: RadiusFilter) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_ordering(mut self, ordering: SortOrder) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Metric label for the query shape.
    pub fn kind(&self) -> &'static str {
        if self.radius.is_some() {
            "radius"
        } else {
            "text"
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    /// Distance to the origin rounded to meters. Only set for radius queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Unrounded distance used for ranking.
    #[serde(skip)]
    pub exact_distance_km: Option<f64>,
    /// Whether the shop snapshot is older than the configured staleness bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_stale: Option<bool>,
}

/// A page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    /// Number of matches before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl SearchPage {
    pub fn ids(&self) -> Vec<i64> {
        self.hits.iter().map(|h| h.entry.id).collect()
    }
}
