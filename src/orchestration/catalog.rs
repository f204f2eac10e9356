//! Catalog sync: resolve archive commodity names to canonical products.

use crate::datasource::{ArchiveError, PriceArchive};
use crate::db::Repository;
use crate::domain::SourceFeed;
use crate::resolver::{self, SynonymDictionary};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Aggregate outcome of one catalog sync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Unlike the per-series price fetches, a catalog failure is fatal: with
/// no metadata there is nothing meaningful to sync.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] ArchiveError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct CatalogSync {
    repo: Arc<Repository>,
    archive: Arc<dyn PriceArchive>,
    dict: SynonymDictionary,
}

impl CatalogSync {
    pub fn new(repo: Arc<Repository>, archive: Arc<dyn PriceArchive>) -> Self {
        Self {
            repo,
            archive,
            dict: SynonymDictionary::builtin(),
        }
    }

    /// Fetch the archive catalog and persist one match link per entry.
    ///
    /// Idempotent: unchanged inputs reproduce the same links and scores.
    pub async fn sync(&self) -> Result<CatalogSummary, CatalogError> {
        let entries = self.archive.fetch_catalog().await?;
        let candidates = self.repo.list_product_candidates().await?;

        let mut matched = 0usize;
        let mut unmatched = 0usize;

        for entry in &entries {
            let outcome = resolver::resolve(&entry.commodity_name, &candidates, &self.dict);
            if outcome.product_id.is_some() {
                matched += 1;
            } else {
                unmatched += 1;
            }

            let country_id = self.repo.find_or_create_country(&entry.country_iso3).await?;
            let market_id = self
                .repo
                .find_or_create_market(country_id, &entry.market_name)
                .await?;
            let price_stage_id = match &entry.price_stage {
                Some(name) => Some(self.repo.find_or_create_price_stage(name).await?),
                None => None,
            };

            self.repo
                .upsert_source_link(
                    SourceFeed::FpmaRetail,
                    Some(&entry.series_id),
                    &outcome,
                    Some(country_id),
                    Some(market_id),
                    price_stage_id,
                )
                .await?;
        }

        let summary = CatalogSummary {
            total: entries.len(),
            matched,
            unmatched,
        };
        info!(
            total = summary.total,
            matched = summary.matched,
            unmatched = summary.unmatched,
            "catalog sync finished"
        );
        Ok(summary)
    }
}
