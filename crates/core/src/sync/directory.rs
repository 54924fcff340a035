//! HTTP client for the shop directory service.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{ShopDirectory, ShopDirectoryError};
use crate::catalog::ShopLocation;
use crate::config::SyncConfig;
use crate::metrics;

/// Shop directory backed by the shop service's REST API.
///
/// Expects `GET {base}/{id}/` for a single shop and `GET {base}/?owner_id=`
/// for an owner's shops. The list endpoint may answer with a bare array or a
/// paginated `{"results": [...]}` object.
pub struct HttpShopDirectory {
    client: Client,
    base_url: String,
}

impl HttpShopDirectory {
    pub fn new(config: &SyncConfig) -> Result<Self, ShopDirectoryError> {
        if config.shop_service_url.trim().is_empty() {
            return Err(ShopDirectoryError::NotConfigured(
                "sync.shop_service_url is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.shop_service_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ShopDirectory for HttpShopDirectory {
    async fn shop(&self, shop_id: i64) -> Result<Option<ShopLocation>, ShopDirectoryError> {
        let url = format!("{}/{}/", self.base_url, shop_id);
        debug!("Shop directory lookup: id={}", shop_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            metrics::SHOP_DIRECTORY_ERRORS
                .with_label_values(&["shop"])
                .inc();
            ShopDirectoryError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            metrics::SHOP_DIRECTORY_ERRORS
                .with_label_values(&["shop"])
                .inc();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopDirectoryError::Unavailable {
                status: status.as_u16(),
                message: body,
            });
        }

        let fetched_at = Utc::now();
        let record: ShopRecord = response.json().await.map_err(|e| {
            ShopDirectoryError::Parse(format!("shop {}: {}", shop_id, e))
        })?;

        Ok(Some(record.into_location(fetched_at)))
    }

    async fn shops_by_owner(
        &self,
        owner_id: i64,
        token: Option<&str>,
    ) -> Result<Vec<ShopLocation>, ShopDirectoryError> {
        let url = format!("{}/", self.base_url);
        debug!("Shop directory owner lookup: owner_id={}", owner_id);

        let mut request = self
            .client
            .get(&url)
            .query(&[("owner_id", owner_id.to_string())]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            metrics::SHOP_DIRECTORY_ERRORS
                .with_label_values(&["shops_by_owner"])
                .inc();
            ShopDirectoryError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            metrics::SHOP_DIRECTORY_ERRORS
                .with_label_values(&["shops_by_owner"])
                .inc();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopDirectoryError::Unavailable {
                status: status.as_u16(),
                message: body,
            });
        }

        let fetched_at = Utc::now();
        let list: ShopListResponse = response.json().await.map_err(|e| {
            ShopDirectoryError::Parse(format!("shops of owner {}: {}", owner_id, e))
        })?;

        Ok(list
            .into_records()
            .into_iter()
            .map(|r| r.into_location(fetched_at))
            .collect())
    }
}

/// A shop as served by the directory.
#[derive(Debug, Deserialize)]
struct ShopRecord {
    id: i64,
    name: String,
    #[serde(default, deserialize_with = "coordinate_component")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "coordinate_component")]
    longitude: Option<f64>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ShopRecord {
    /// The directory's own modification time orders snapshots when present;
    /// otherwise the fetch time does.
    fn into_location(self, fetched_at: DateTime<Utc>) -> ShopLocation {
        ShopLocation {
            shop_id: self.id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            observed_at: self.updated_at.unwrap_or(fetched_at),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShopListResponse {
    Paginated { results: Vec<ShopRecord> },
    Plain(Vec<ShopRecord>),
}

impl ShopListResponse {
    fn into_records(self) -> Vec<ShopRecord> {
        match self {
            ShopListResponse::Paginated { results } => results,
            ShopListResponse::Plain(records) => records,
        }
    }
}

/// Accepts a number, a decimal string (as emitted for decimal fields), an
/// empty string or null.
fn coordinate_component<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
