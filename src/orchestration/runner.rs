//! The batch signal run: normalize, group, compute, persist.
//!
//! One pass over the stored observations per invocation. Conversion
//! tables are loaded once at the start and threaded through by reference;
//! soft failures accumulate in per-item counters instead of aborting.

use crate::config::Config;
use crate::datasource::PriceArchive;
use crate::db::{Repository, SignalWrite};
use crate::domain::{RawObservation, SourceFeed};
use crate::engine;
use crate::normalize::{self, UnitTable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Aggregate outcome of one run, reported identically by the one-shot
/// binary and the HTTP trigger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Signal candidacies processed (one per series).
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct SignalRunner {
    repo: Arc<Repository>,
    archive: Arc<dyn PriceArchive>,
    config: Config,
}

impl SignalRunner {
    pub fn new(repo: Arc<Repository>, archive: Arc<dyn PriceArchive>, config: Config) -> Self {
        Self {
            repo,
            archive,
            config,
        }
    }

    /// Execute one batch run anchored at `now`.
    ///
    /// `now` is passed explicitly so both trigger surfaces share one code
    /// path and tests can pin the horizon anchor.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, RunError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "starting signal run");

        let rates = self.repo.load_rate_table().await?;
        let units = UnitTable::builtin().with_overrides(self.repo.load_unit_overrides().await?);

        let mut errored = 0usize;
        if self.config.fpma_fetch_enabled {
            errored += self.refresh_archive_prices().await?;
        }

        let rows = self.repo.load_observation_rows().await?;
        let mut normalized = Vec::new();
        for row in rows {
            let obs = match RawObservation::parse(
                &row.source,
                &row.obs_date,
                &row.price,
                &row.currency,
                &row.unit,
                row.product_id,
                row.variety_id,
                row.country_id,
                row.market_id,
                row.price_stage_id,
            ) {
                Ok(obs) => obs,
                Err(e) => {
                    warn!(obs_key = %row.obs_key, "rejecting stored observation: {}", e);
                    errored += 1;
                    continue;
                }
            };

            match normalize::normalize(obs.price, &obs.currency, &obs.unit, &rates, &units) {
                Ok(price_usd_per_kg) => normalized.push((obs, price_usd_per_kg)),
                Err(e) => {
                    warn!(obs_key = %obs.obs_key, "dropping observation: {}", e);
                    errored += 1;
                }
            }
        }

        let batch = engine::build_series(normalized);
        let mut skipped = batch.skipped_missing_link;
        let total = batch.series.len();
        let mut created = 0usize;
        let mut updated = 0usize;

        for series in &batch.series {
            let Some(signal) = engine::compute_signal(series, now) else {
                continue;
            };
            match self.repo.upsert_signal(&signal).await? {
                SignalWrite::Created => created += 1,
                SignalWrite::Updated => updated += 1,
                SignalWrite::SkippedConflict => {
                    warn!(key = ?signal.key, "lost signal create race, skipping");
                    skipped += 1;
                }
            }
        }

        info!(
            %run_id, total, created, updated, skipped, errored,
            "signal run finished"
        );
        Ok(RunSummary {
            run_id,
            total,
            created,
            updated,
            skipped,
            errored,
            success: true,
            message: None,
        })
    }

    /// Pull fresh prices for every linked archive series.
    ///
    /// Per-series failures (already retried inside the archive client)
    /// are soft: logged, counted, and the run continues.
    async fn refresh_archive_prices(&self) -> Result<usize, RunError> {
        let links = self.repo.list_linked_series(SourceFeed::FpmaRetail).await?;
        let mut errored = 0usize;

        for link in links {
            let Some(series_id) = link.series_id.as_deref() else {
                continue;
            };

            match self.archive.fetch_series_prices(series_id).await {
                Ok(points) => {
                    let mut observations = Vec::new();
                    for point in points {
                        match RawObservation::new(
                            SourceFeed::FpmaRetail,
                            point.date,
                            point.price,
                            point.currency,
                            point.unit,
                            link.product_id,
                            None,
                            link.country_id,
                            link.market_id,
                            link.price_stage_id,
                        ) {
                            Ok(obs) => observations.push(obs),
                            Err(e) => {
                                warn!(series_id, "rejecting archive point: {}", e);
                                errored += 1;
                            }
                        }
                    }
                    let new = self.repo.insert_observations(&observations).await?;
                    info!(series_id, fetched = observations.len(), new, "archive series refreshed");
                }
                Err(e) => {
                    warn!(series_id, "archive series fetch failed after retries: {}", e);
                    errored += 1;
                }
            }
        }
        Ok(errored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{ArchivePricePoint, CatalogEntry, MockArchive};
    use crate::db::migrations::init_db;
    use crate::domain::{Decimal, MatchCandidate, MatchType, TrendStatus};
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn test_config() -> Config {
        Config {
            port: 0,
            database_path: ":memory:".to_string(),
            fpma_api_url: "http://example.invalid".to_string(),
            recompute_token: "secret".to_string(),
            fpma_fetch_enabled: false,
        }
    }

    async fn setup() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    async fn seed_azn_observations(repo: &Repository) {
        repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
        for (date, price) in [("2025-05-05", "1.00"), ("2025-06-01", "1.87")] {
            let obs = RawObservation::parse(
                "ministry", date, price, "AZN", "kg",
                Some(1), None, Some(10), Some(100), None,
            )
            .unwrap();
            repo.insert_observation(&obs).await.unwrap();
        }
    }

    #[tokio::test]
    async fn run_computes_creates_then_updates() {
        let (repo, _temp) = setup().await;
        seed_azn_observations(&repo).await;
        let runner = SignalRunner::new(repo.clone(), Arc::new(MockArchive::new()), test_config());

        let summary = runner.run(fixed_now()).await.unwrap();
        assert!(summary.success);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.errored, 0);

        let signals = repo.list_signals(None, None).await.unwrap();
        assert_eq!(signals.len(), 1);
        let signal = &signals[0];
        assert_eq!(signal.current_price, dec("1.1"));
        assert_eq!(signal.month_ago_price, Some(dec("0.588")));
        assert_eq!(signal.mom, Some(dec("87.07")));
        assert_eq!(signal.mom_status, TrendStatus::Increased);
        assert_eq!(signal.data_source, SourceFeed::Ministry);

        let second = runner.run(fixed_now()).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);

        // Pinned now: the recomputed record is identical.
        let again = repo.list_signals(None, None).await.unwrap();
        assert_eq!(again[0], signals[0]);
    }

    #[tokio::test]
    async fn unknown_currency_drops_and_counts() {
        let (repo, _temp) = setup().await;
        // No rate for GEL.
        repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
        let obs = RawObservation::parse(
            "regional", "2025-06-01", "4.2", "GEL", "kg",
            Some(1), None, Some(11), Some(101), None,
        )
        .unwrap();
        repo.insert_observation(&obs).await.unwrap();

        let runner = SignalRunner::new(repo.clone(), Arc::new(MockArchive::new()), test_config());
        let summary = runner.run(fixed_now()).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.errored, 1);
        assert!(summary.success);
        assert!(repo.list_signals(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_linkage_skips_and_counts() {
        let (repo, _temp) = setup().await;
        repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
        let obs = RawObservation::parse(
            "ministry", "2025-06-01", "1.87", "AZN", "kg",
            None, None, Some(10), Some(100), None,
        )
        .unwrap();
        repo.insert_observation(&obs).await.unwrap();

        let runner = SignalRunner::new(repo.clone(), Arc::new(MockArchive::new()), test_config());
        let summary = runner.run(fixed_now()).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errored, 0);
    }

    #[tokio::test]
    async fn archive_refresh_ingests_linked_series() {
        let (repo, _temp) = setup().await;
        repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
        let candidate = MatchCandidate {
            source_name: "Apples".to_string(),
            product_id: Some(1),
            score: 100,
            match_type: MatchType::Dictionary,
        };
        repo.upsert_source_link(
            SourceFeed::FpmaRetail,
            Some("s1"),
            &candidate,
            Some(10),
            Some(100),
            None,
        )
        .await
        .unwrap();

        let archive = MockArchive::new()
            .with_entry(CatalogEntry {
                series_id: "s1".to_string(),
                commodity_name: "Apples".to_string(),
                country_iso3: "AZE".to_string(),
                market_name: "Baku".to_string(),
                price_stage: None,
                currency: "AZN".to_string(),
                unit: "kg".to_string(),
            })
            .with_prices(
                "s1",
                vec![ArchivePricePoint {
                    date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                    price: dec("1.87"),
                    currency: "AZN".to_string(),
                    unit: "kg".to_string(),
                }],
            );

        let mut config = test_config();
        config.fpma_fetch_enabled = true;
        let runner = SignalRunner::new(repo.clone(), Arc::new(archive), config);
        let summary = runner.run(fixed_now()).await.unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.errored, 0);

        let signals = repo
            .list_signals(None, Some(SourceFeed::FpmaRetail))
            .await
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].current_price, dec("1.1"));
    }

    #[tokio::test]
    async fn archive_series_failure_is_soft() {
        let (repo, _temp) = setup().await;
        repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
        seed_azn_observations(&repo).await;
        let candidate = MatchCandidate {
            source_name: "Apples".to_string(),
            product_id: Some(2),
            score: 100,
            match_type: MatchType::Dictionary,
        };
        repo.upsert_source_link(
            SourceFeed::FpmaRetail,
            Some("dead"),
            &candidate,
            Some(10),
            Some(100),
            None,
        )
        .await
        .unwrap();

        let archive = MockArchive::new().with_series_failure("dead");
        let mut config = test_config();
        config.fpma_fetch_enabled = true;
        let runner = SignalRunner::new(repo.clone(), Arc::new(archive), config);
        let summary = runner.run(fixed_now()).await.unwrap();

        // The ministry series still computes; the dead series only bumps
        // the error counter.
        assert!(summary.success);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.errored, 1);
    }
}
