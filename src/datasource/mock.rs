//! In-memory archive for tests.

use super::{ArchiveError, ArchivePricePoint, CatalogEntry, PriceArchive};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Mock archive returning predefined catalog entries and price points.
#[derive(Debug, Clone, Default)]
pub struct MockArchive {
    catalog: Vec<CatalogEntry>,
    prices: HashMap<String, Vec<ArchivePricePoint>>,
    fail_catalog: bool,
    fail_series: HashSet<String>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.catalog.push(entry);
        self
    }

    pub fn with_prices(mut self, series_id: &str, points: Vec<ArchivePricePoint>) -> Self {
        self.prices.insert(series_id.to_string(), points);
        self
    }

    /// Make `fetch_catalog` fail, simulating a dead metadata endpoint.
    pub fn with_catalog_failure(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    /// Make one series' price fetch fail while others keep working.
    pub fn with_series_failure(mut self, series_id: &str) -> Self {
        self.fail_series.insert(series_id.to_string());
        self
    }
}

#[async_trait]
impl PriceArchive for MockArchive {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ArchiveError> {
        if self.fail_catalog {
            return Err(ArchiveError::Network("catalog unreachable".to_string()));
        }
        Ok(self.catalog.clone())
    }

    async fn fetch_series_prices(
        &self,
        series_id: &str,
    ) -> Result<Vec<ArchivePricePoint>, ArchiveError> {
        if self.fail_series.contains(series_id) {
            return Err(ArchiveError::HttpStatus {
                status: 500,
                message: "series unavailable".to_string(),
            });
        }
        Ok(self.prices.get(series_id).cloned().unwrap_or_default())
    }
}
