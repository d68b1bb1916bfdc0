//! Property-based tests using proptest for fuzzing and invariant testing.
//!
//! These tests verify that:
//! 1. Return series keep strictly increasing dates at every granularity
//! 2. Rebalance date sequences respect their window and ordering contracts
//! 3. Portfolio allocation and funding invariants hold under random inputs
//! 4. Performance metrics stay within their mathematical ranges

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use folio::analytics::{cagr, max_drawdown, stdev};
use folio::calendar::generate_rebalance_dates;
use folio::engine::{Engine, SimulationConfig};
use folio::portfolio::{Portfolio, CASH};
use folio::returns::build_returns;
use folio::types::{Granularity, PriceRecord, RebalancePolicy, TrajectoryPoint};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Strategy for a positive daily price history of 2..400 records starting
/// at an arbitrary date in 2015-2020.
fn price_history_strategy() -> impl Strategy<Value = Vec<PriceRecord>> {
    (
        0i64..2000,
        prop::collection::vec(0.5f64..1.5, 2..400),
    )
        .prop_map(|(start_offset, factors)| {
            let mut date = d(2015, 1, 2) + Duration::days(start_offset);
            let mut price = 100.0;
            let mut records = Vec::with_capacity(factors.len());
            for factor in factors {
                price = (price * factor).max(0.01);
                records.push(PriceRecord::new(date, price, price));
                date += Duration::days(1);
            }
            records
        })
}

/// Contiguous daily history starting exactly on a year-end boundary.
fn boundary_aligned_history() -> impl Strategy<Value = Vec<PriceRecord>> {
    prop::collection::vec(0.5f64..1.5, 2..400).prop_map(|factors| {
        let mut date = d(2014, 12, 31);
        let mut price = 100.0;
        let mut records = Vec::with_capacity(factors.len());
        for factor in factors {
            price = (price * factor).max(0.01);
            records.push(PriceRecord::new(date, price, price));
            date += Duration::days(1);
        }
        records
    })
}

fn policy_strategy() -> impl Strategy<Value = RebalancePolicy> {
    prop::sample::select(RebalancePolicy::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========================================================================
    // Return Series Invariants
    // ========================================================================

    #[test]
    fn return_series_dates_strictly_increasing(records in price_history_strategy()) {
        let series = build_returns(&records, true).unwrap();
        for granularity in Granularity::ALL {
            let points = series.get(granularity).unwrap();
            prop_assert!(!points.is_empty());
            prop_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        }
    }

    #[test]
    fn return_series_ends_at_last_observation(records in price_history_strategy()) {
        let last_date = records.last().unwrap().date;
        let series = build_returns(&records, true).unwrap();
        for granularity in Granularity::ALL {
            let points = series.get(granularity).unwrap();
            prop_assert_eq!(points.last().unwrap().date, last_date);
        }
    }

    #[test]
    fn full_return_matches_price_ratio(records in price_history_strategy()) {
        let first = records.first().unwrap().close;
        let last = records.last().unwrap().close;
        let series = build_returns(&records, true).unwrap();

        let full = series.get(Granularity::Full).unwrap();
        prop_assert_eq!(full.len(), 1);
        prop_assert!((full[0].value - (last / first - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn resampled_returns_compound_to_full_return(records in boundary_aligned_history()) {
        let first = records.first().unwrap().close;
        let last = records.last().unwrap().close;
        let series = build_returns(&records, true).unwrap();

        // The history starts on Dec 31, a month/quarter/half/year boundary,
        // so the zero-filled first period drops no growth and chaining every
        // period's return reproduces the full-window growth.
        for granularity in [
            Granularity::Monthly,
            Granularity::Quarterly,
            Granularity::SemiAnnual,
            Granularity::Annual,
            Granularity::Daily,
        ] {
            let compounded: f64 = series
                .get(granularity)
                .unwrap()
                .iter()
                .map(|p| 1.0 + p.value)
                .product();
            prop_assert!(
                (compounded - last / first).abs() / (last / first) < 1e-9,
                "granularity {:?}: {} vs {}", granularity, compounded, last / first
            );
        }
    }

    // ========================================================================
    // Rebalance Date Invariants
    // ========================================================================

    #[test]
    fn rebalance_dates_within_window_and_sorted(
        policy in policy_strategy(),
        span_days in 10i64..1500,
        start_offset in 0i64..1000,
    ) {
        let start = d(2015, 1, 2) + Duration::days(start_offset);
        let end = start + Duration::days(span_days);
        let available: BTreeSet<NaiveDate> = (0..=span_days)
            .map(|i| start + Duration::days(i))
            .collect();

        let dates = generate_rebalance_dates(start, end, policy, &available);

        prop_assert!(!dates.is_empty());
        prop_assert_eq!(*dates.last().unwrap(), end);
        prop_assert!(dates.iter().all(|&date| date > start && date <= end));
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    // ========================================================================
    // Portfolio Invariants
    // ========================================================================

    #[test]
    fn balance_preserves_total_and_residual_goes_to_cash(
        cash_amount in 1.0f64..1_000_000.0,
        w_a in 0.0f64..60.0,
        w_b in 0.0f64..40.0,
    ) {
        let mut portfolio = Portfolio::new(
            ["A", "B"],
            d(2021, 1, 1),
            d(2021, 12, 31),
            RebalancePolicy::Monthly,
        );
        let mut weights = BTreeMap::new();
        weights.insert("A".to_string(), w_a);
        weights.insert("B".to_string(), w_b);
        portfolio.allocate(&weights).unwrap();
        portfolio.balance(cash_amount);

        let total = portfolio.total_balance();
        prop_assert!((total - cash_amount).abs() < 1e-6 * cash_amount.max(1.0));
        prop_assert!(portfolio.funds().values().all(|&b| b >= 0.0));
        let expected_cash = cash_amount * (100.0 - w_a - w_b) / 100.0;
        prop_assert!((portfolio.funds()[CASH] - expected_cash).abs() < 1e-6 * cash_amount.max(1.0));
    }

    #[test]
    fn over_allocation_always_rejected(
        w_a in 50.0f64..100.0,
        w_b in 50.1f64..100.0,
    ) {
        let mut portfolio = Portfolio::new(
            ["A", "B"],
            d(2021, 1, 1),
            d(2021, 12, 31),
            RebalancePolicy::Monthly,
        );
        let mut weights = BTreeMap::new();
        weights.insert("A".to_string(), w_a);
        weights.insert("B".to_string(), w_b);
        prop_assert!(portfolio.allocate(&weights).is_err());
    }

    // ========================================================================
    // Engine Invariants
    // ========================================================================

    #[test]
    fn flat_prices_preserve_value_under_any_policy(
        policy in policy_strategy(),
        weight in 1.0f64..100.0,
    ) {
        let start = d(2021, 1, 1);
        let end = d(2022, 12, 31);
        let mut records = Vec::new();
        let mut date = start;
        while date <= end {
            records.push(PriceRecord::new(date, 100.0, 100.0));
            date += Duration::days(1);
        }

        let mut engine = Engine::new(SimulationConfig {
            initial_cash: 10_000.0,
            start_date: start,
            end_date: end,
            policy,
            use_adjusted: true,
            risk_free_rate: 0.0,
        });
        engine.add_data("FLAT", records);

        let mut weights = BTreeMap::new();
        weights.insert("FLAT".to_string(), weight);
        let result = engine.run(&weights).unwrap();

        prop_assert!((result.final_value - 10_000.0).abs() < 1e-6);
        prop_assert!(result.trajectory.iter().all(|p| (p.value - 10_000.0).abs() < 1e-6));
    }

    // ========================================================================
    // Metric Ranges
    // ========================================================================

    #[test]
    fn max_drawdown_within_unit_range(values in prop::collection::vec(1.0f64..1_000_000.0, 2..100)) {
        let trajectory: Vec<TrajectoryPoint> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| TrajectoryPoint::new(d(2020, 1, 1) + Duration::days(i as i64), v))
            .collect();

        let dd = max_drawdown(&trajectory);
        prop_assert!((0.0..1.0).contains(&dd));
        prop_assert!(stdev(&trajectory) >= 0.0);
    }

    #[test]
    fn monotone_growth_has_zero_drawdown_and_positive_cagr(
        steps in prop::collection::vec(1.0001f64..1.05, 2..60),
    ) {
        let mut value = 1_000.0;
        let mut trajectory = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            value *= step;
            trajectory.push(TrajectoryPoint::new(
                d(2020, 1, 1) + Duration::days(30 * i as i64),
                value,
            ));
        }

        prop_assert_eq!(max_drawdown(&trajectory), 0.0);
        prop_assert!(cagr(&trajectory) > 0.0);
    }
}
