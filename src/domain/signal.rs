//! Price trend signals and horizon definitions.

use crate::domain::{CanonicalKey, Decimal, SourceFeed, TrendStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Horizon windows, as inclusive day-offset ranges measured from the
/// moment of computation (not from the series' own latest date).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    Month,
    ThreeMonth,
    SixMonth,
    Year,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::Month,
        Horizon::ThreeMonth,
        Horizon::SixMonth,
        Horizon::Year,
    ];

    /// Inclusive `[min, max]` age range in days.
    pub fn window(&self) -> (i64, i64) {
        match self {
            Horizon::Month => (25, 45),
            Horizon::ThreeMonth => (80, 100),
            Horizon::SixMonth => (170, 190),
            Horizon::Year => (350, 380),
        }
    }
}

/// Percent change beyond which a horizon is classified as moved.
const STABLE_BAND_PCT: &str = "2.0";

impl TrendStatus {
    /// Classify a rounded percent change.
    ///
    /// A missing change (no qualifying point, or a zero horizon price)
    /// classifies as `Stable`, identical to a genuine near-zero change.
    pub fn classify(change: Option<Decimal>) -> TrendStatus {
        let band = Decimal::from_str_canonical(STABLE_BAND_PCT).expect("valid decimal literal");
        match change {
            Some(c) if c > band => TrendStatus::Increased,
            Some(c) if c < -band => TrendStatus::Decreased,
            _ => TrendStatus::Stable,
        }
    }
}

/// Computed trend record for one canonical series.
///
/// One row per `CanonicalKey`; overwritten wholesale on every run, never
/// deleted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSignal {
    pub key: CanonicalKey,
    pub current_price: Decimal,
    pub current_price_date: NaiveDate,
    pub previous_price: Option<Decimal>,
    pub month_ago_price: Option<Decimal>,
    pub three_month_ago_price: Option<Decimal>,
    pub six_month_ago_price: Option<Decimal>,
    pub year_ago_price: Option<Decimal>,
    pub mom: Option<Decimal>,
    pub three_month_change: Option<Decimal>,
    pub six_month_change: Option<Decimal>,
    pub year_change: Option<Decimal>,
    pub mom_status: TrendStatus,
    pub three_month_status: TrendStatus,
    pub six_month_status: TrendStatus,
    pub year_status: TrendStatus,
    pub data_source: SourceFeed,
}
