//! Parsing of raw search parameters into a validated [`SearchQuery`].
//!
//! Every field arrives as an optional string (as from a URL query string) so
//! that malformed numbers surface as `InvalidQuery` instead of a transport
//! level rejection.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{RadiusFilter, SearchError, SearchQuery, SortOrder};
use crate::catalog::{max_bound_minor, min_bound_minor, normalize_needle, AttributeFilter};
use crate::config::SearchConfig;
use crate::geo::Coordinate;

/// Raw, unvalidated search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius_km: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sku: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SearchParams {
    /// Search kind these parameters ask for, for labelling rejected queries.
    pub fn kind(&self) -> &'static str {
        let geo = [&self.lat, &self.lng, &self.radius_km]
            .iter()
            .any(|v| non_blank(v.as_deref()).is_some());
        if geo {
            "radius"
        } else {
            "text"
        }
    }

    /// Validate every parameter and build the query.
    ///
    /// Blank values are treated as absent. `limit` is clamped to
    /// `[1, max_limit]`.
    pub fn into_query(self, limits: &SearchConfig) -> Result<SearchQuery, SearchError> {
        let lat = parse_opt::<f64>("lat", self.lat.as_deref())?;
        let lng = parse_opt::<f64>("lng", self.lng.as_deref())?;
        let radius_km = parse_opt::<f64>("radius_km", self.radius_km.as_deref())?;

        let origin = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(SearchError::InvalidQuery(
                    "lat and lng must be supplied together".to_string(),
                ))
            }
        };

        let radius = match (origin, radius_km) {
            (Some(origin), Some(radius_km)) => Some(RadiusFilter::new(origin, radius_km)?),
            (None, None) => None,
            (Some(_), None) => {
                return Err(SearchError::InvalidQuery(
                    "radius_km is required when lat/lng are given".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(SearchError::InvalidQuery(
                    "lat and lng are required when radius_km is given".to_string(),
                ))
            }
        };

        let min_price = price_bound("min_price", self.min_price.as_deref(), min_bound_minor)?;
        let max_price = price_bound("max_price", self.max_price.as_deref(), max_bound_minor)?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(SearchError::InvalidQuery(format!(
                    "min_price ({}) is greater than max_price ({})",
                    min, max
                )));
            }
        }

        let filter = AttributeFilter {
            category_id: parse_opt::<i64>("category", self.category.as_deref())?,
            min_price,
            max_price,
            sku: non_blank(self.sku.as_deref()).map(str::to_string),
            available_only: true,
        };

        let ordering = match non_blank(self.ordering.as_deref()) {
            Some(s) => s.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };

        let limit = parse_opt::<usize>("limit", self.limit.as_deref())?
            .unwrap_or(limits.default_limit)
            .clamp(1, limits.max_limit.max(1));
        let offset = parse_opt::<usize>("offset", self.offset.as_deref())?.unwrap_or(0);

        Ok(SearchQuery {
            text: self.q.as_deref().and_then(normalize_needle),
            radius,
            filter,
            ordering,
            limit,
            offset,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>, SearchError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            SearchError::InvalidQuery(format!("{} must be a number, got '{}'", name, raw))
        }),
    }
}

/// Parse a price bound, rejecting values the catalog cannot compare in cents.
fn price_bound(
    name: &str,
    value: Option<&str>,
    to_minor: fn(Decimal) -> Option<i64>,
) -> Result<Option<Decimal>, SearchError> {
    let Some(price) = parse_opt::<Decimal>(name, value)? else {
        return Ok(None);
    };
    if to_minor(price).is_none() {
        return Err(SearchError::InvalidQuery(format!(
            "{} is out of range, got '{}'",
            name, price
        )));
    }
    Ok(Some(price))
}
