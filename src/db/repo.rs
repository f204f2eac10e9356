//! Repository layer: all SQL lives here.

use crate::domain::{
    CanonicalKey, Decimal, MatchCandidate, MatchType, PriceSignal, ProductCandidate, RawObservation,
    SourceFeed, TrendStatus,
};
use crate::normalize::{RateTable, UnitRow};
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

/// Outcome of a signal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalWrite {
    Created,
    Updated,
    /// Lost a create race to a concurrent writer; counted, not fatal.
    SkippedConflict,
}

/// A raw observation row as stored, before boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRow {
    pub obs_key: String,
    pub source: String,
    pub obs_date: String,
    pub price: String,
    pub currency: String,
    pub unit: String,
    pub product_id: Option<i64>,
    pub variety_id: Option<i64>,
    pub country_id: Option<i64>,
    pub market_id: Option<i64>,
    pub price_stage_id: Option<i64>,
}

/// A persisted source-product match link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    pub source: SourceFeed,
    pub source_name: String,
    pub series_id: Option<String>,
    pub product_id: Option<i64>,
    pub country_id: Option<i64>,
    pub market_id: Option<i64>,
    pub price_stage_id: Option<i64>,
    pub match_score: i64,
    pub match_type: MatchType,
}

pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // --- currency and unit tables -------------------------------------

    /// Load the currency table for one run. Rows with unparseable rates
    /// are skipped with a warning rather than poisoning the run.
    pub async fn load_rate_table(&self) -> Result<RateTable, sqlx::Error> {
        let rows = sqlx::query("SELECT code, rate_to_usd FROM currencies")
            .fetch_all(&self.pool)
            .await?;

        let mut rates = RateTable::new();
        for row in &rows {
            let code: String = row.get("code");
            let rate_str: String = row.get("rate_to_usd");
            match Decimal::from_str_canonical(&rate_str) {
                Ok(rate) => rates.insert(&code, rate),
                Err(_) => warn!(code, rate = %rate_str, "skipping unparseable currency rate"),
            }
        }
        Ok(rates)
    }

    pub async fn upsert_currency(&self, code: &str, rate: &Decimal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO currencies (code, rate_to_usd, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                rate_to_usd = excluded.rate_to_usd,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(code.trim().to_uppercase())
        .bind(rate.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unit rows that override or extend the built-in conversion table.
    pub async fn load_unit_overrides(&self) -> Result<Vec<UnitRow>, sqlx::Error> {
        let rows = sqlx::query("SELECT code, base_unit, conversion_rate FROM units")
            .fetch_all(&self.pool)
            .await?;

        let mut units = Vec::new();
        for row in &rows {
            let code: String = row.get("code");
            let rate_str: String = row.get("conversion_rate");
            match Decimal::from_str_canonical(&rate_str) {
                Ok(conversion_rate) => units.push(UnitRow {
                    code,
                    base_unit: row.get("base_unit"),
                    conversion_rate,
                }),
                Err(_) => warn!(code, rate = %rate_str, "skipping unparseable unit rate"),
            }
        }
        Ok(units)
    }

    pub async fn upsert_unit(
        &self,
        code: &str,
        base_unit: &str,
        conversion_rate: &Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO units (code, base_unit, conversion_rate)
            VALUES (?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                base_unit = excluded.base_unit,
                conversion_rate = excluded.conversion_rate
            "#,
        )
        .bind(code)
        .bind(base_unit)
        .bind(conversion_rate.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- raw observations ---------------------------------------------

    /// Insert one observation idempotently. Returns true when the row is
    /// new.
    pub async fn insert_observation(&self, obs: &RawObservation) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO raw_observations (
                obs_key, source, obs_date, price, currency, unit,
                product_id, variety_id, country_id, market_id, price_stage_id,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(obs_key) DO NOTHING
            "#,
        )
        .bind(obs.obs_key.as_str())
        .bind(obs.source.as_str())
        .bind(obs.date.format("%Y-%m-%d").to_string())
        .bind(obs.price.to_canonical_string())
        .bind(obs.currency.as_str())
        .bind(obs.unit.as_str())
        .bind(obs.product_id)
        .bind(obs.variety_id)
        .bind(obs.country_id)
        .bind(obs.market_id)
        .bind(obs.price_stage_id)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch, returning how many rows were new.
    pub async fn insert_observations(
        &self,
        observations: &[RawObservation],
    ) -> Result<usize, sqlx::Error> {
        let mut inserted = 0usize;
        for obs in observations {
            if self.insert_observation(obs).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// All stored observation rows, oldest date first.
    pub async fn load_observation_rows(&self) -> Result<Vec<ObservationRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT obs_key, source, obs_date, price, currency, unit,
                   product_id, variety_id, country_id, market_id, price_stage_id
            FROM raw_observations
            ORDER BY obs_date ASC, obs_key ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ObservationRow {
                obs_key: row.get("obs_key"),
                source: row.get("source"),
                obs_date: row.get("obs_date"),
                price: row.get("price"),
                currency: row.get("currency"),
                unit: row.get("unit"),
                product_id: row.get("product_id"),
                variety_id: row.get("variety_id"),
                country_id: row.get("country_id"),
                market_id: row.get("market_id"),
                price_stage_id: row.get("price_stage_id"),
            })
            .collect())
    }

    // --- price signals -------------------------------------------------

    /// Find-or-create/update a signal record keyed strictly by the
    /// 5-tuple. A lost create race is reported as `SkippedConflict`.
    pub async fn upsert_signal(&self, signal: &PriceSignal) -> Result<SignalWrite, sqlx::Error> {
        let exists = self.get_signal(&signal.key).await?.is_some();
        if exists {
            self.update_signal(signal).await?;
            return Ok(SignalWrite::Updated);
        }

        match self.insert_signal(signal).await {
            Ok(()) => Ok(SignalWrite::Created),
            Err(e) if is_unique_violation(&e) => Ok(SignalWrite::SkippedConflict),
            Err(e) => Err(e),
        }
    }

    async fn insert_signal(&self, signal: &PriceSignal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO price_signals (
                product_id, variety_id, country_id, market_id, price_stage_id,
                current_price, current_price_date, previous_price,
                month_ago_price, three_month_ago_price, six_month_ago_price, year_ago_price,
                mom, three_month_change, six_month_change, year_change,
                mom_status, three_month_status, six_month_status, year_status,
                data_source, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.key.product_id)
        .bind(signal.key.variety_id.unwrap_or(0))
        .bind(signal.key.country_id)
        .bind(signal.key.market_id)
        .bind(signal.key.price_stage_id.unwrap_or(0))
        .bind(signal.current_price.to_canonical_string())
        .bind(signal.current_price_date.format("%Y-%m-%d").to_string())
        .bind(signal.previous_price.map(|d| d.to_canonical_string()))
        .bind(signal.month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.three_month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.six_month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.year_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.mom.map(|d| d.to_canonical_string()))
        .bind(signal.three_month_change.map(|d| d.to_canonical_string()))
        .bind(signal.six_month_change.map(|d| d.to_canonical_string()))
        .bind(signal.year_change.map(|d| d.to_canonical_string()))
        .bind(signal.mom_status.as_str())
        .bind(signal.three_month_status.as_str())
        .bind(signal.six_month_status.as_str())
        .bind(signal.year_status.as_str())
        .bind(signal.data_source.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_signal(&self, signal: &PriceSignal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE price_signals SET
                current_price = ?, current_price_date = ?, previous_price = ?,
                month_ago_price = ?, three_month_ago_price = ?,
                six_month_ago_price = ?, year_ago_price = ?,
                mom = ?, three_month_change = ?, six_month_change = ?, year_change = ?,
                mom_status = ?, three_month_status = ?, six_month_status = ?, year_status = ?,
                data_source = ?, updated_at = ?
            WHERE product_id = ? AND variety_id = ? AND country_id = ?
              AND market_id = ? AND price_stage_id = ?
            "#,
        )
        .bind(signal.current_price.to_canonical_string())
        .bind(signal.current_price_date.format("%Y-%m-%d").to_string())
        .bind(signal.previous_price.map(|d| d.to_canonical_string()))
        .bind(signal.month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.three_month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.six_month_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.year_ago_price.map(|d| d.to_canonical_string()))
        .bind(signal.mom.map(|d| d.to_canonical_string()))
        .bind(signal.three_month_change.map(|d| d.to_canonical_string()))
        .bind(signal.six_month_change.map(|d| d.to_canonical_string()))
        .bind(signal.year_change.map(|d| d.to_canonical_string()))
        .bind(signal.mom_status.as_str())
        .bind(signal.three_month_status.as_str())
        .bind(signal.six_month_status.as_str())
        .bind(signal.year_status.as_str())
        .bind(signal.data_source.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(signal.key.product_id)
        .bind(signal.key.variety_id.unwrap_or(0))
        .bind(signal.key.country_id)
        .bind(signal.key.market_id)
        .bind(signal.key.price_stage_id.unwrap_or(0))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_signal(&self, key: &CanonicalKey) -> Result<Option<PriceSignal>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT * FROM price_signals
            WHERE product_id = ? AND variety_id = ? AND country_id = ?
              AND market_id = ? AND price_stage_id = ?
            "#,
        )
        .bind(key.product_id)
        .bind(key.variety_id.unwrap_or(0))
        .bind(key.country_id)
        .bind(key.market_id)
        .bind(key.price_stage_id.unwrap_or(0))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| signal_from_row(&r)))
    }

    /// Signals, optionally filtered by product and/or source.
    pub async fn list_signals(
        &self,
        product_id: Option<i64>,
        source: Option<SourceFeed>,
    ) -> Result<Vec<PriceSignal>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM price_signals
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR data_source = ?2)
            ORDER BY product_id, variety_id, country_id, market_id, price_stage_id
            "#,
        )
        .bind(product_id)
        .bind(source.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(signal_from_row).collect())
    }

    // --- products and match links --------------------------------------

    /// Candidates for the resolver, in ascending-id order so that equal
    /// top scores break toward the lowest canonical id.
    pub async fn list_product_candidates(&self) -> Result<Vec<ProductCandidate>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT id, local_name, local_name_en FROM products ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|row| ProductCandidate {
                id: row.get("id"),
                local_name: row.get("local_name"),
                local_name_en: row.get("local_name_en"),
            })
            .collect())
    }

    pub async fn insert_product(
        &self,
        local_name: &str,
        local_name_en: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO products (local_name, local_name_en) VALUES (?, ?)")
            .bind(local_name)
            .bind(local_name_en)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Persist a resolver outcome on the source-product record.
    /// Re-running with unchanged inputs writes identical links.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_source_link(
        &self,
        source: SourceFeed,
        series_id: Option<&str>,
        candidate: &MatchCandidate,
        country_id: Option<i64>,
        market_id: Option<i64>,
        price_stage_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO source_products (
                source, source_name, series_id, product_id,
                country_id, market_id, price_stage_id,
                match_score, match_type, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, source_name) DO UPDATE SET
                series_id = excluded.series_id,
                product_id = excluded.product_id,
                country_id = excluded.country_id,
                market_id = excluded.market_id,
                price_stage_id = excluded.price_stage_id,
                match_score = excluded.match_score,
                match_type = excluded.match_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(source.as_str())
        .bind(candidate.source_name.as_str())
        .bind(series_id)
        .bind(candidate.product_id)
        .bind(country_id)
        .bind(market_id)
        .bind(price_stage_id)
        .bind(candidate.score)
        .bind(candidate.match_type.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_source_link(
        &self,
        source: SourceFeed,
        source_name: &str,
    ) -> Result<Option<SourceLink>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM source_products WHERE source = ? AND source_name = ?",
        )
        .bind(source.as_str())
        .bind(source_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| source_link_from_row(&r)))
    }

    /// Links that carry both an archive series id and a resolved product:
    /// the set whose prices the runner refreshes.
    pub async fn list_linked_series(
        &self,
        source: SourceFeed,
    ) -> Result<Vec<SourceLink>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM source_products
            WHERE source = ? AND series_id IS NOT NULL AND product_id IS NOT NULL
            ORDER BY source_name ASC
            "#,
        )
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(source_link_from_row).collect())
    }

    // --- countries, markets, price stages ------------------------------

    pub async fn find_or_create_country(&self, iso3: &str) -> Result<i64, sqlx::Error> {
        sqlx::query("INSERT INTO countries (iso3) VALUES (?) ON CONFLICT(iso3) DO NOTHING")
            .bind(iso3)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id FROM countries WHERE iso3 = ?")
            .bind(iso3)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    pub async fn find_or_create_market(
        &self,
        country_id: i64,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query(
            "INSERT INTO markets (country_id, name) VALUES (?, ?) ON CONFLICT(country_id, name) DO NOTHING",
        )
        .bind(country_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        let row = sqlx::query("SELECT id FROM markets WHERE country_id = ? AND name = ?")
            .bind(country_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    pub async fn find_or_create_price_stage(&self, name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query("INSERT INTO price_stages (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id FROM price_stages WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn opt_decimal(row: &SqliteRow, column: &str) -> Option<Decimal> {
    let value: Option<String> = row.get(column);
    value.and_then(|s| Decimal::from_str_canonical(&s).ok())
}

fn status(row: &SqliteRow, column: &str) -> TrendStatus {
    let value: String = row.get(column);
    TrendStatus::parse(&value).unwrap_or(TrendStatus::Stable) // Default fallback
}

fn signal_from_row(row: &SqliteRow) -> PriceSignal {
    let variety_id: i64 = row.get("variety_id");
    let price_stage_id: i64 = row.get("price_stage_id");
    let current_price: String = row.get("current_price");
    let date_str: String = row.get("current_price_date");
    let source_str: String = row.get("data_source");

    PriceSignal {
        key: CanonicalKey {
            product_id: row.get("product_id"),
            variety_id: (variety_id != 0).then_some(variety_id),
            country_id: row.get("country_id"),
            market_id: row.get("market_id"),
            price_stage_id: (price_stage_id != 0).then_some(price_stage_id),
        },
        current_price: Decimal::from_str_canonical(&current_price).unwrap_or_default(),
        current_price_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_default(),
        previous_price: opt_decimal(row, "previous_price"),
        month_ago_price: opt_decimal(row, "month_ago_price"),
        three_month_ago_price: opt_decimal(row, "three_month_ago_price"),
        six_month_ago_price: opt_decimal(row, "six_month_ago_price"),
        year_ago_price: opt_decimal(row, "year_ago_price"),
        mom: opt_decimal(row, "mom"),
        three_month_change: opt_decimal(row, "three_month_change"),
        six_month_change: opt_decimal(row, "six_month_change"),
        year_change: opt_decimal(row, "year_change"),
        mom_status: status(row, "mom_status"),
        three_month_status: status(row, "three_month_status"),
        six_month_status: status(row, "six_month_status"),
        year_status: status(row, "year_status"),
        data_source: SourceFeed::parse(&source_str).unwrap_or(SourceFeed::Ministry), // Default fallback
    }
}

fn source_link_from_row(row: &SqliteRow) -> SourceLink {
    let source_str: String = row.get("source");
    let match_type_str: String = row.get("match_type");
    SourceLink {
        source: SourceFeed::parse(&source_str).unwrap_or(SourceFeed::FpmaRetail), // Default fallback
        source_name: row.get("source_name"),
        series_id: row.get("series_id"),
        product_id: row.get("product_id"),
        country_id: row.get("country_id"),
        market_id: row.get("market_id"),
        price_stage_id: row.get("price_stage_id"),
        match_score: row.get("match_score"),
        match_type: MatchType::parse(&match_type_str).unwrap_or(MatchType::None),
    }
}
