//! Remote price archive abstraction.

use crate::domain::Decimal;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod fpma;
pub mod mock;
pub mod regional;

pub use fpma::FpmaArchive;
pub use mock::MockArchive;
pub use regional::parse_regional_csv;

/// One series' metadata as published by the archive catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Archive-side series identifier.
    pub series_id: String,
    /// Free-text commodity name, resolved against canonical products.
    pub commodity_name: String,
    pub country_iso3: String,
    pub market_name: String,
    pub price_stage: Option<String>,
    pub currency: String,
    pub unit: String,
}

/// One raw price point as published by the archive, pre-normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub unit: String,
}

/// Error type for archive operations.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("rate limited")]
    RateLimited,
    #[error("csv parse error: {0}")]
    Csv(String),
}

/// Remote archive of series metadata and prices.
///
/// Implementations own their retry policy; callers treat catalog failures
/// as fatal to the run and per-series failures as soft.
#[async_trait]
pub trait PriceArchive: Send + Sync + fmt::Debug {
    /// Fetch the full series catalog.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ArchiveError>;

    /// Fetch all price points for one series.
    async fn fetch_series_prices(
        &self,
        series_id: &str,
    ) -> Result<Vec<ArchivePricePoint>, ArchiveError>;
}

/// Linear retry policy: the n-th retry sleeps `n * step`, up to
/// `max_retries` retries after the initial attempt.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    attempt: u32,
    max_retries: u32,
    step: Duration,
}

impl LinearBackoff {
    pub fn new(max_retries: u32, step: Duration) -> Self {
        LinearBackoff {
            attempt: 0,
            max_retries,
            step,
        }
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl backoff::backoff::Backoff for LinearBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(self.step * self.attempt)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}
