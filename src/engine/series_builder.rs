//! Grouping normalized observations into canonical series.

use crate::domain::{CanonicalKey, CanonicalSeries, Decimal, PricePoint, RawObservation, SourceFeed};
use std::collections::BTreeMap;
use tracing::debug;

/// Result of one grouping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesBatch {
    /// Series in deterministic `(key, source)` order.
    pub series: Vec<CanonicalSeries>,
    /// Observations dropped for lacking a product/country/market link.
    pub skipped_missing_link: usize,
}

/// Group observations (already normalized to USD/kg) by canonical key and
/// originating feed.
///
/// One series never mixes feeds: the same 5-part key reported by two
/// sources produces two independent signal candidacies.
pub fn build_series(
    normalized: impl IntoIterator<Item = (RawObservation, Decimal)>,
) -> SeriesBatch {
    let mut grouped: BTreeMap<(CanonicalKey, SourceFeed), Vec<PricePoint>> = BTreeMap::new();
    let mut skipped_missing_link = 0usize;

    for (obs, price_usd_per_kg) in normalized {
        let Some(key) = CanonicalKey::from_observation(&obs) else {
            debug!(obs_key = %obs.obs_key, "observation lacks identity links, skipping");
            skipped_missing_link += 1;
            continue;
        };
        grouped.entry((key, obs.source)).or_default().push(PricePoint {
            date: obs.date,
            price_usd_per_kg,
        });
    }

    let series = grouped
        .into_iter()
        .map(|((key, source), points)| CanonicalSeries {
            key,
            source,
            points,
        })
        .collect();

    SeriesBatch {
        series,
        skipped_missing_link,
    }
}
