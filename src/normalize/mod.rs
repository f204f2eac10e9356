//! Currency and unit normalization to USD per kilogram.
//!
//! Pure over the supplied tables: both are loaded once per batch run and
//! passed in explicitly, never held as module state.

pub mod units;

pub use units::{UnitRow, UnitTable};

use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Currency table: ISO code to units-of-currency-per-1-USD.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        RateTable {
            rates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, code: &str, rate: Decimal) {
        self.rates.insert(code.trim().to_uppercase(), rate);
    }

    pub fn get(&self, code: &str) -> Option<Decimal> {
        self.rates.get(&code.trim().to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Why an observation could not be normalized.
///
/// All variants are soft: the caller logs, drops the observation, and
/// moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("non-positive rate for currency: {0}")]
    InvalidRate(String),
    #[error("non-positive conversion factor for unit: {0}")]
    InvalidFactor(String),
}

/// Convert a reported `(price, currency, unit)` into USD per kilogram,
/// rounded to 3 decimal places.
///
/// A currency absent from the rate table fails normalization. A unit with
/// no exact table match falls back to a numeric kilogram prefix
/// (`"15 kg"` -> factor 15) and finally to factor 1, treating the unknown
/// unit as already being kilograms.
pub fn normalize(
    price: Decimal,
    currency: &str,
    unit: &str,
    rates: &RateTable,
    units: &UnitTable,
) -> Result<Decimal, NormalizeError> {
    let rate = rates
        .get(currency)
        .ok_or_else(|| NormalizeError::UnknownCurrency(currency.to_string()))?;
    if !rate.is_positive() {
        return Err(NormalizeError::InvalidRate(currency.to_string()));
    }

    let factor = match units.factor(unit) {
        Some(f) => f,
        None => match units::numeric_prefix_kg(unit) {
            Some(f) => f,
            None => {
                debug!(unit, "no unit conversion entry, assuming kilograms");
                Decimal::one()
            }
        },
    };
    if !factor.is_positive() {
        return Err(NormalizeError::InvalidFactor(unit.to_string()));
    }

    Ok(((price / rate) / factor).round_dp(3))
}
