use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{PriceSignal, SourceFeed};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalsQuery {
    pub product_id: Option<i64>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRow {
    pub product_id: i64,
    pub variety_id: Option<i64>,
    pub country_id: i64,
    pub market_id: i64,
    pub price_stage_id: Option<i64>,
    pub current_price: String,
    pub current_price_date: String,
    pub previous_price: Option<String>,
    pub month_ago_price: Option<String>,
    pub three_month_ago_price: Option<String>,
    pub six_month_ago_price: Option<String>,
    pub year_ago_price: Option<String>,
    pub mom: Option<String>,
    pub three_month_change: Option<String>,
    pub six_month_change: Option<String>,
    pub year_change: Option<String>,
    pub mom_status: String,
    pub three_month_status: String,
    pub six_month_status: String,
    pub year_status: String,
    pub data_source: String,
}

impl From<&PriceSignal> for SignalRow {
    fn from(signal: &PriceSignal) -> Self {
        let fmt = |d: &crate::domain::Decimal| d.to_canonical_string();
        SignalRow {
            product_id: signal.key.product_id,
            variety_id: signal.key.variety_id,
            country_id: signal.key.country_id,
            market_id: signal.key.market_id,
            price_stage_id: signal.key.price_stage_id,
            current_price: fmt(&signal.current_price),
            current_price_date: signal.current_price_date.format("%Y-%m-%d").to_string(),
            previous_price: signal.previous_price.as_ref().map(fmt),
            month_ago_price: signal.month_ago_price.as_ref().map(fmt),
            three_month_ago_price: signal.three_month_ago_price.as_ref().map(fmt),
            six_month_ago_price: signal.six_month_ago_price.as_ref().map(fmt),
            year_ago_price: signal.year_ago_price.as_ref().map(fmt),
            mom: signal.mom.as_ref().map(fmt),
            three_month_change: signal.three_month_change.as_ref().map(fmt),
            six_month_change: signal.six_month_change.as_ref().map(fmt),
            year_change: signal.year_change.as_ref().map(fmt),
            mom_status: signal.mom_status.as_str().to_string(),
            three_month_status: signal.three_month_status.as_str().to_string(),
            six_month_status: signal.six_month_status.as_str().to_string(),
            year_status: signal.year_status.as_str().to_string(),
            data_source: signal.data_source.as_str().to_string(),
        }
    }
}

pub async fn get_signals(
    Query(params): Query<SignalsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SignalRow>>, AppError> {
    let source = params
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            SourceFeed::parse(s)
                .map_err(|_| AppError::BadRequest(format!("Invalid source: {}", s)))
        })
        .transpose()?;

    let signals = state.repo.list_signals(params.product_id, source).await?;
    Ok(Json(signals.iter().map(SignalRow::from).collect()))
}
