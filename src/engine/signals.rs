//! Horizon-based change and status computation for one canonical series.
//!
//! Horizons are anchored to the moment of computation, not to the series'
//! own latest date: re-running at a different wall-clock time against the
//! same raw data may legitimately pick a different reference point. Tests
//! therefore pin `now`.

use crate::domain::{
    CanonicalSeries, Decimal, Horizon, PriceSignal, PricePoint, TrendStatus,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Compute the trend signal for one series at the given moment.
///
/// Returns `None` for an empty series.
pub fn compute_signal(series: &CanonicalSeries, now: DateTime<Utc>) -> Option<PriceSignal> {
    let mut points = series.points.clone();
    // Newest first; same-date duplicates keep their input order.
    points.sort_by(|a, b| b.date.cmp(&a.date));

    let current = points.first()?;
    let previous_price = points.get(1).map(|p| p.price_usd_per_kg);
    let today = now.date_naive();

    let month_ago_price = horizon_price(&points, today, Horizon::Month);
    let three_month_ago_price = horizon_price(&points, today, Horizon::ThreeMonth);
    let six_month_ago_price = horizon_price(&points, today, Horizon::SixMonth);
    let year_ago_price = horizon_price(&points, today, Horizon::Year);

    let mom = percent_change(current.price_usd_per_kg, month_ago_price);
    let three_month_change = percent_change(current.price_usd_per_kg, three_month_ago_price);
    let six_month_change = percent_change(current.price_usd_per_kg, six_month_ago_price);
    let year_change = percent_change(current.price_usd_per_kg, year_ago_price);

    Some(PriceSignal {
        key: series.key,
        current_price: current.price_usd_per_kg,
        current_price_date: current.date,
        previous_price,
        month_ago_price,
        three_month_ago_price,
        six_month_ago_price,
        year_ago_price,
        mom,
        three_month_change,
        six_month_change,
        year_change,
        mom_status: TrendStatus::classify(mom),
        three_month_status: TrendStatus::classify(three_month_change),
        six_month_status: TrendStatus::classify(six_month_change),
        year_status: TrendStatus::classify(year_change),
        data_source: series.source,
    })
}

/// The price whose age in days falls inside the horizon window, choosing
/// the smallest age (closest to now) when several qualify.
fn horizon_price(points: &[PricePoint], today: NaiveDate, horizon: Horizon) -> Option<Decimal> {
    let (min_age, max_age) = horizon.window();
    points
        .iter()
        .filter_map(|p| {
            let age = (today - p.date).num_days();
            (age >= min_age && age <= max_age).then_some((age, p.price_usd_per_kg))
        })
        .min_by_key(|(age, _)| *age)
        .map(|(_, price)| price)
}

/// `(current - reference) / reference * 100`, rounded to 2 decimal places.
///
/// `None` when the reference is missing or zero.
fn percent_change(current: Decimal, reference: Option<Decimal>) -> Option<Decimal> {
    let reference = reference?;
    if reference.is_zero() {
        return None;
    }
    Some(((current - reference) / reference * Decimal::hundred()).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CanonicalKey, SourceFeed};
    use chrono::{Duration, TimeZone};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn key() -> CanonicalKey {
        CanonicalKey {
            product_id: 1,
            variety_id: None,
            country_id: 10,
            market_id: 100,
            price_stage_id: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn series_at_ages(ages_and_prices: &[(i64, &str)]) -> CanonicalSeries {
        let today = fixed_now().date_naive();
        CanonicalSeries {
            key: key(),
            source: SourceFeed::Ministry,
            points: ages_and_prices
                .iter()
                .map(|(age, price)| PricePoint {
                    date: today - Duration::days(*age),
                    price_usd_per_kg: dec(price),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_series_yields_no_signal() {
        let series = series_at_ages(&[]);
        assert!(compute_signal(&series, fixed_now()).is_none());
    }

    #[test]
    fn current_and_previous_come_from_newest_points() {
        let series = series_at_ages(&[(27, "0.588"), (0, "1.1"), (95, "0.5")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.current_price, dec("1.1"));
        assert_eq!(signal.current_price_date, fixed_now().date_naive());
        assert_eq!(signal.previous_price, Some(dec("0.588")));
    }

    #[test]
    fn window_membership_selects_expected_points() {
        // Ages 10, 27, 95, 400: month -> 27, three-month -> 95, six-month
        // and year -> none.
        let series = series_at_ages(&[(10, "2"), (27, "3"), (95, "4"), (400, "5")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.month_ago_price, Some(dec("3")));
        assert_eq!(signal.three_month_ago_price, Some(dec("4")));
        assert_eq!(signal.six_month_ago_price, None);
        assert_eq!(signal.year_ago_price, None);
    }

    #[test]
    fn closest_point_wins_inside_a_window() {
        let series = series_at_ages(&[(0, "1"), (26, "1.5"), (44, "9")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.month_ago_price, Some(dec("1.5")));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let series = series_at_ages(&[(0, "1"), (25, "2")]);
        assert_eq!(
            compute_signal(&series, fixed_now()).unwrap().month_ago_price,
            Some(dec("2"))
        );
        let series = series_at_ages(&[(0, "1"), (45, "2")]);
        assert_eq!(
            compute_signal(&series, fixed_now()).unwrap().month_ago_price,
            Some(dec("2"))
        );
        let series = series_at_ages(&[(0, "1"), (46, "2")]);
        assert_eq!(
            compute_signal(&series, fixed_now()).unwrap().month_ago_price,
            None
        );
    }

    #[test]
    fn horizons_anchor_to_now_not_series_latest() {
        // Latest point is itself 27 days old: it is simultaneously the
        // current price and the month-ago reference.
        let series = series_at_ages(&[(27, "1.5"), (95, "1")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.current_price, dec("1.5"));
        assert_eq!(signal.month_ago_price, Some(dec("1.5")));
        assert_eq!(signal.mom, Some(dec("0")));
        assert_eq!(signal.mom_status, TrendStatus::Stable);
    }

    #[test]
    fn change_is_rounded_to_two_places() {
        let series = series_at_ages(&[(0, "1.1"), (27, "0.588")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.mom, Some(dec("87.07")));
        assert_eq!(signal.mom_status, TrendStatus::Increased);
    }

    #[test]
    fn zero_reference_price_yields_null_change_and_stable() {
        let series = series_at_ages(&[(0, "1.1"), (27, "0")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.month_ago_price, Some(dec("0")));
        assert_eq!(signal.mom, None);
        assert_eq!(signal.mom_status, TrendStatus::Stable);
    }

    #[test]
    fn status_boundaries() {
        // 102 vs 100 -> exactly +2.00: stable.
        let series = series_at_ages(&[(0, "102"), (30, "100")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.mom, Some(dec("2")));
        assert_eq!(signal.mom_status, TrendStatus::Stable);

        // 102.01 vs 100 -> +2.01: increased.
        let series = series_at_ages(&[(0, "102.01"), (30, "100")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.mom_status, TrendStatus::Increased);

        // 97.99 vs 100 -> -2.01: decreased.
        let series = series_at_ages(&[(0, "97.99"), (30, "100")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.mom_status, TrendStatus::Decreased);
    }

    #[test]
    fn missing_horizons_classify_stable() {
        let series = series_at_ages(&[(0, "1.1")]);
        let signal = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(signal.previous_price, None);
        assert_eq!(signal.year_change, None);
        assert_eq!(signal.mom_status, TrendStatus::Stable);
        assert_eq!(signal.three_month_status, TrendStatus::Stable);
        assert_eq!(signal.six_month_status, TrendStatus::Stable);
        assert_eq!(signal.year_status, TrendStatus::Stable);
    }

    #[test]
    fn recomputation_with_pinned_now_is_byte_identical() {
        let series = series_at_ages(&[(0, "1.1"), (27, "0.588"), (95, "0.61"), (360, "0.4")]);
        let first = compute_signal(&series, fixed_now()).unwrap();
        let second = compute_signal(&series, fixed_now()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn shifting_now_can_move_the_reference_point() {
        let series = series_at_ages(&[(0, "1.1"), (27, "0.588")]);
        let later = fixed_now() + Duration::days(30);
        // 30 days later the old reference has aged out of the month window
        // (57 days) and the latest point itself (now 30 days old) takes
        // its place.
        let signal = compute_signal(&series, later).unwrap();
        assert_eq!(signal.month_ago_price, Some(dec("1.1")));
        assert_eq!(signal.mom, Some(dec("0")));
    }
}
