//! Canonical series identity and normalized price points.

use crate::domain::{Decimal, RawObservation, SourceFeed};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The 5-part identity of one logical price series.
///
/// Two observations carrying the same key are comparable and orderable by
/// date regardless of which feed reported them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CanonicalKey {
    pub product_id: i64,
    pub variety_id: Option<i64>,
    pub country_id: i64,
    pub market_id: i64,
    pub price_stage_id: Option<i64>,
}

impl CanonicalKey {
    /// Extract the key from an observation.
    ///
    /// Returns `None` when any of the three mandatory identity links
    /// (product, country, market) is missing; such rows are skipped by the
    /// series builder and counted.
    pub fn from_observation(obs: &RawObservation) -> Option<Self> {
        Some(CanonicalKey {
            product_id: obs.product_id?,
            variety_id: obs.variety_id,
            country_id: obs.country_id?,
            market_id: obs.market_id?,
            price_stage_id: obs.price_stage_id,
        })
    }
}

/// One normalized point of a series: date and USD-per-kilogram price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_usd_per_kg: Decimal,
}

/// One logical time series: a key, the feed that reported it, and its
/// normalized points (unordered until the signal calculator sorts them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSeries {
    pub key: CanonicalKey,
    pub source: SourceFeed,
    pub points: Vec<PricePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawObservation;

    fn obs(product: Option<i64>, country: Option<i64>, market: Option<i64>) -> RawObservation {
        RawObservation::parse(
            "ministry", "2025-05-05", "1.00", "AZN", "kg", product, Some(7), country, market, None,
        )
        .unwrap()
    }

    #[test]
    fn key_extracted_when_links_present() {
        let key = CanonicalKey::from_observation(&obs(Some(1), Some(10), Some(100))).unwrap();
        assert_eq!(key.product_id, 1);
        assert_eq!(key.variety_id, Some(7));
        assert_eq!(key.country_id, 10);
        assert_eq!(key.market_id, 100);
        assert_eq!(key.price_stage_id, None);
    }

    #[test]
    fn key_missing_when_any_mandatory_link_absent() {
        assert!(CanonicalKey::from_observation(&obs(None, Some(10), Some(100))).is_none());
        assert!(CanonicalKey::from_observation(&obs(Some(1), None, Some(100))).is_none());
        assert!(CanonicalKey::from_observation(&obs(Some(1), Some(10), None)).is_none());
    }

    #[test]
    fn keys_order_deterministically() {
        let a = CanonicalKey {
            product_id: 1,
            variety_id: None,
            country_id: 10,
            market_id: 100,
            price_stage_id: None,
        };
        let b = CanonicalKey {
            product_id: 2,
            ..a
        };
        assert!(a < b);
    }
}
