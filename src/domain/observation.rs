//! Raw price observations and their ingestion-boundary validation.

use crate::domain::{Decimal, SourceFeed};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single raw price observation as reported by a source feed.
///
/// Immutable once stored; identity is the `obs_key` hash, which makes
/// re-ingesting the same feed rows a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Stable unique identifier derived from the observation's natural key.
    pub obs_key: String,
    pub source: SourceFeed,
    pub date: NaiveDate,
    /// Price as reported, in the source's own currency and unit.
    pub price: Decimal,
    /// ISO currency code as reported (e.g. "AZN", "USD").
    pub currency: String,
    /// Unit of measure as reported (e.g. "kg", "100 kg", "tonne").
    pub unit: String,
    pub product_id: Option<i64>,
    pub variety_id: Option<i64>,
    pub country_id: Option<i64>,
    pub market_id: Option<i64>,
    pub price_stage_id: Option<i64>,
}

/// Validation failure at the ingestion boundary.
///
/// Invalid rows are rejected with a typed error and counted, never coerced
/// to zero or NaN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("invalid observation date: {0}")]
    InvalidDate(String),
    #[error("invalid observation price: {0}")]
    InvalidPrice(String),
    #[error("negative observation price: {0}")]
    NegativePrice(String),
    #[error("unknown source feed: {0}")]
    UnknownFeed(String),
}

impl RawObservation {
    /// Build a validated observation from already-typed fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: SourceFeed,
        date: NaiveDate,
        price: Decimal,
        currency: String,
        unit: String,
        product_id: Option<i64>,
        variety_id: Option<i64>,
        country_id: Option<i64>,
        market_id: Option<i64>,
        price_stage_id: Option<i64>,
    ) -> Result<Self, ObservationError> {
        if price.is_negative() {
            return Err(ObservationError::NegativePrice(price.to_canonical_string()));
        }
        let obs_key = Self::compute_obs_key(
            source,
            date,
            &price,
            &currency,
            &unit,
            product_id,
            variety_id,
            country_id,
            market_id,
            price_stage_id,
        );
        Ok(RawObservation {
            obs_key,
            source,
            date,
            price,
            currency,
            unit,
            product_id,
            variety_id,
            country_id,
            market_id,
            price_stage_id,
        })
    }

    /// Parse and validate an observation from raw text fields.
    ///
    /// This is the fail-fast ingestion boundary: a row with a malformed
    /// date or a non-numeric or negative price is rejected here.
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        source: &str,
        date: &str,
        price: &str,
        currency: &str,
        unit: &str,
        product_id: Option<i64>,
        variety_id: Option<i64>,
        country_id: Option<i64>,
        market_id: Option<i64>,
        price_stage_id: Option<i64>,
    ) -> Result<Self, ObservationError> {
        let source = SourceFeed::parse(source)
            .map_err(|e| ObservationError::UnknownFeed(e.0))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ObservationError::InvalidDate(date.to_string()))?;
        let price = Decimal::from_str_canonical(price)
            .map_err(|_| ObservationError::InvalidPrice(price.to_string()))?;
        Self::new(
            source,
            date,
            price,
            currency.trim().to_string(),
            unit.trim().to_string(),
            product_id,
            variety_id,
            country_id,
            market_id,
            price_stage_id,
        )
    }

    /// Stable hash of the observation's natural key.
    #[allow(clippy::too_many_arguments)]
    fn compute_obs_key(
        source: SourceFeed,
        date: NaiveDate,
        price: &Decimal,
        currency: &str,
        unit: &str,
        product_id: Option<i64>,
        variety_id: Option<i64>,
        country_id: Option<i64>,
        market_id: Option<i64>,
        price_stage_id: Option<i64>,
    ) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(source.as_str());
        hasher.update(date.format("%Y-%m-%d").to_string());
        hasher.update(price.to_canonical_string());
        hasher.update(currency);
        hasher.update(unit);
        for id in [product_id, variety_id, country_id, market_id, price_stage_id] {
            hasher.update(id.unwrap_or(-1).to_le_bytes());
        }
        let hash = hasher.finalize();
        format!("obs:{}", hex::encode(&hash[..16]))
    }
}
