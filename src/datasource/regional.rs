//! Bulk CSV parsing for the regional statistical office archive.
//!
//! The regional office publishes a flat CSV export rather than an API;
//! rows are validated strictly at this boundary.

use super::ArchiveError;
use crate::domain::{ObservationError, RawObservation, SourceFeed};

#[derive(Debug, serde::Deserialize)]
struct Row {
    date: String,
    price: String,
    currency: String,
    unit: String,
    product_id: Option<i64>,
    variety_id: Option<i64>,
    country_id: Option<i64>,
    market_id: Option<i64>,
    price_stage_id: Option<i64>,
}

/// Parse the regional bulk CSV into observations tagged
/// [`SourceFeed::Regional`].
///
/// Any malformed row fails the whole file: a partial bulk load would be
/// indistinguishable from a complete one downstream.
pub fn parse_regional_csv(csv_bytes: &[u8]) -> Result<Vec<RawObservation>, ArchiveError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_bytes);

    let mut observations = Vec::new();
    for record in reader.deserialize::<Row>() {
        let row = record.map_err(|e| ArchiveError::Csv(e.to_string()))?;
        let obs = RawObservation::parse(
            SourceFeed::Regional.as_str(),
            &row.date,
            &row.price,
            &row.currency,
            &row.unit,
            row.product_id,
            row.variety_id,
            row.country_id,
            row.market_id,
            row.price_stage_id,
        )
        .map_err(|e: ObservationError| ArchiveError::Csv(e.to_string()))?;
        observations.push(obs);
    }

    Ok(observations)
}
