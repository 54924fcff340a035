//! The geo radius search engine.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::{SearchError, SearchHit, SearchPage, SearchQuery, SortOrder};
use crate::catalog::{CandidateQuery, CatalogEntry, CatalogStore};
use crate::geo::{haversine_km, round_km, BoundingBox};
use crate::metrics;
use crate::sync::StalenessPolicy;

/// Stateless search over a shared catalog store.
///
/// The engine never writes to the store and holds no mutable state, so one
/// instance can serve any number of concurrent searches.
pub struct SearchEngine {
    store: Arc<dyn CatalogStore>,
    staleness: Option<StalenessPolicy>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            staleness: None,
        }
    }

    /// Report `snapshot_stale` on every hit according to `policy`.
    pub fn with_staleness(mut self, policy: StalenessPolicy) -> Self {
        self.staleness = Some(policy);
        self
    }

    /// Run a search.
    ///
    /// Radius queries are ordered by ascending exact distance, then by id.
    /// Other queries follow `query.ordering`, then id. Pagination is applied
    /// to the fully sorted match set.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
        let kind = query.kind();
        let _timer = metrics::SEARCH_DURATION
            .with_label_values(&[kind])
            .start_timer();

        let bbox = match query.radius {
            Some(radius) => Some(BoundingBox::around(radius.origin(), radius.radius_km())?),
            None => None,
        };

        let candidate_query = CandidateQuery {
            filter: query.filter.clone(),
            text: query.text.clone(),
            bbox,
        };

        let candidates = self.store.candidates(&candidate_query).map_err(|e| {
            warn!(error = %e, "Catalog store unavailable during search");
            metrics::SEARCH_REQUESTS
                .with_label_values(&[kind, "unavailable"])
                .inc();
            SearchError::UpstreamUnavailable(e.to_string())
        })?;
        let candidate_count = candidates.len();

        let mut matches: Vec<(CatalogEntry, Option<f64>)> = Vec::with_capacity(candidate_count);
        for entry in candidates {
            // The store pre-filter may over-approximate; re-check everything.
            if !query.filter.matches(&entry) {
                continue;
            }
            if let Some(ref needle) = query.text {
                if !entry.matches_text(needle) {
                    continue;
                }
            }

            match query.radius {
                Some(radius) => {
                    let Some(coordinate) = entry.shop.coordinate() else {
                        continue;
                    };
                    let distance = haversine_km(radius.origin(), coordinate);
                    if distance <= radius.radius_km() {
                        matches.push((entry, Some(distance)));
                    }
                }
                None => matches.push((entry, None)),
            }
        }

        if query.radius.is_some() {
            matches.sort_by(|(a, da), (b, db)| {
                let da = da.unwrap_or(f64::INFINITY);
                let db = db.unwrap_or(f64::INFINITY);
                da.total_cmp(&db).then_with(|| a.id.cmp(&b.id))
            });
        } else {
            matches.sort_by(|(a, _), (b, _)| compare_entries(query.ordering, a, b));
        }

        let total = matches.len();
        let now = Utc::now();
        let hits: Vec<SearchHit> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(entry, distance)| {
                let snapshot_stale = self
                    .staleness
                    .as_ref()
                    .map(|policy| policy.is_stale(entry.shop.synced_at, now));
                SearchHit {
                    entry,
                    distance_km: distance.map(round_km),
                    exact_distance_km: distance,
                    snapshot_stale,
                }
            })
            .collect();

        metrics::SEARCH_REQUESTS
            .with_label_values(&[kind, "ok"])
            .inc();
        metrics::SEARCH_CANDIDATES
            .with_label_values(&[kind])
            .observe(candidate_count as f64);
        metrics::SEARCH_RESULTS
            .with_label_values(&[kind])
            .observe(total as f64);

        debug!(
            kind,
            candidates = candidate_count,
            total,
            returned = hits.len(),
            "Search completed"
        );

        Ok(SearchPage {
            hits,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    /// Fetch a single entry by id.
    pub fn lookup(&self, id: i64) -> Result<CatalogEntry, SearchError> {
        self.store.get(id).map_err(|e| {
            let err = SearchError::from(e);
            if let SearchError::UpstreamUnavailable(ref msg) = err {
                warn!(id, error = %msg, "Catalog store unavailable during lookup");
            }
            err
        })
    }

    /// Staleness flag for a single entry, if a policy is configured.
    pub fn snapshot_stale(&self, entry: &CatalogEntry) -> Option<bool> {
        self.staleness
            .as_ref()
            .map(|policy| policy.is_stale(entry.shop.synced_at, Utc::now()))
    }
}

fn compare_entries(ordering: SortOrder, a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    let primary = match ordering {
        SortOrder::Recent => b.updated_at.cmp(&a.updated_at),
        SortOrder::Oldest => a.updated_at.cmp(&b.updated_at),
        SortOrder::PriceAsc => a.price.cmp(&b.price),
        SortOrder::PriceDesc => b.price.cmp(&a.price),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}
