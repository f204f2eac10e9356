//! Client for the global retail/wholesale price-monitoring archive.

use super::{ArchiveError, ArchivePricePoint, CatalogEntry, LinearBackoff, PriceArchive};
use crate::domain::Decimal;
use async_trait::async_trait;
use backoff::future::retry;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, warn};

/// Archive client over the price-monitoring JSON API.
#[derive(Debug, Clone)]
pub struct FpmaArchive {
    client: Client,
    base_url: String,
}

impl FpmaArchive {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// GET a JSON document with the linear retry policy: transient
    /// failures (network, 429, 5xx) retry up to three times, other client
    /// errors fail immediately.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ArchiveError> {
        retry(LinearBackoff::default(), || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(ArchiveError::Network(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(ArchiveError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ArchiveError::HttpStatus {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ArchiveError::HttpStatus {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ArchiveError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceArchive for FpmaArchive {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ArchiveError> {
        let url = format!("{}/series", self.base_url);
        debug!(%url, "fetching archive catalog");

        let response = self.get_json(&url).await?;
        let items = response
            .as_array()
            .ok_or_else(|| ArchiveError::Parse("expected array response".to_string()))?;

        let mut entries = Vec::new();
        for item in items {
            match parse_catalog_entry(item) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping malformed catalog entry: {}", e),
            }
        }
        Ok(entries)
    }

    async fn fetch_series_prices(
        &self,
        series_id: &str,
    ) -> Result<Vec<ArchivePricePoint>, ArchiveError> {
        let url = format!("{}/series/{}/prices", self.base_url, series_id);
        debug!(%url, "fetching series prices");

        let response = self.get_json(&url).await?;
        let items = response
            .as_array()
            .ok_or_else(|| ArchiveError::Parse("expected array response".to_string()))?;

        let mut points = Vec::new();
        for item in items {
            match parse_price_point(item) {
                Ok(point) => points.push(point),
                Err(e) => warn!(series_id, "skipping malformed price point: {}", e),
            }
        }
        Ok(points)
    }
}

fn parse_catalog_entry(item: &serde_json::Value) -> Result<CatalogEntry, ArchiveError> {
    let get_str = |field: &str| -> Result<String, ArchiveError> {
        item.get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ArchiveError::Parse(format!("missing {} field", field)))
    };

    Ok(CatalogEntry {
        series_id: get_str("id")?,
        commodity_name: get_str("commodity")?,
        country_iso3: get_str("country")?,
        market_name: get_str("market")?,
        price_stage: item
            .get("stage")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        currency: get_str("currency")?,
        unit: get_str("unit")?,
    })
}

fn parse_price_point(item: &serde_json::Value) -> Result<ArchivePricePoint, ArchiveError> {
    let date_str = item
        .get("date")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ArchiveError::Parse("missing date field".to_string()))?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ArchiveError::Parse(format!("invalid date: {}", date_str)))?;

    // Prices arrive as JSON numbers; route them through the string parser
    // to stay lossless.
    let price_value = item
        .get("price")
        .ok_or_else(|| ArchiveError::Parse("missing price field".to_string()))?;
    let price_str = match price_value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return Err(ArchiveError::Parse("price is not a number".to_string())),
    };
    let price = Decimal::from_str_canonical(&price_str)
        .map_err(|e| ArchiveError::Parse(format!("invalid price: {}", e)))?;

    let get_str = |field: &str| -> Result<String, ArchiveError> {
        item.get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ArchiveError::Parse(format!("missing {} field", field)))
    };

    Ok(ArchivePricePoint {
        date,
        price,
        currency: get_str("currency")?,
        unit: get_str("unit")?,
    })
}
