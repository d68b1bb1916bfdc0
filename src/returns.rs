//! Return-series construction from raw price history.
//!
//! Converts a single instrument's price history into aligned return series
//! at seven granularities: one full-period return plus annual, semi-annual,
//! quarterly, monthly, weekly and daily period-over-period changes.

use crate::calendar::period_end;
use crate::error::{FolioError, Result};
use crate::types::{Granularity, PriceRecord, ReturnPoint, ReturnSeries};
use chrono::{Duration, NaiveDate};

/// Build the return series for one instrument.
///
/// The input may be unsorted; it is sorted (and de-duplicated) by date
/// before anything else. `use_adjusted` selects the adjusted close as the
/// reference price column, otherwise the raw close is used.
///
/// Period series are produced by resampling the reference price to calendar
/// period ends, forward-filling periods without observations, and taking the
/// period-over-period percentage change. The first change of every series is
/// zero-filled (there is no prior period to compare against), and the final
/// element is re-dated to the true last observation so that a partial final
/// period carries the date the data actually stops at.
///
/// # Errors
/// * [`FolioError::InsufficientData`] if `records` is empty.
/// * [`FolioError::DegenerateData`] if any reference price is non-positive
///   or non-finite; percentage change over such values is meaningless and
///   must not silently propagate into downstream arithmetic.
pub fn build_returns(records: &[PriceRecord], use_adjusted: bool) -> Result<ReturnSeries> {
    if records.is_empty() {
        return Err(FolioError::InsufficientData(
            "price history contains no records".to_string(),
        ));
    }

    let mut sorted: Vec<PriceRecord> = records.to_vec();
    sorted.sort_by_key(|r| r.date);
    sorted.dedup_by_key(|r| r.date);

    let prices: Vec<(NaiveDate, f64)> = sorted
        .iter()
        .map(|r| (r.date, r.reference_price(use_adjusted)))
        .collect();

    for &(date, price) in &prices {
        if !price.is_finite() || price <= 0.0 {
            return Err(FolioError::DegenerateData(format!(
                "non-positive reference price {} at {}",
                price, date
            )));
        }
    }

    let (first, last) = (prices[0], prices[prices.len() - 1]);

    let mut series = ReturnSeries::new();

    // Full-period return, dated at the last observation.
    series.insert(
        Granularity::Full,
        vec![ReturnPoint::new(last.0, last.1 / first.1 - 1.0)],
    );

    for granularity in [
        Granularity::Annual,
        Granularity::SemiAnnual,
        Granularity::Quarterly,
        Granularity::Monthly,
        Granularity::Weekly,
    ] {
        series.insert(granularity, resampled_returns(&prices, granularity));
    }

    series.insert(Granularity::Daily, daily_returns(&prices));

    Ok(series)
}

/// Day-over-day percentage change, first day zero-filled.
fn daily_returns(prices: &[(NaiveDate, f64)]) -> Vec<ReturnPoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &(date, price))| {
            let value = if i == 0 {
                0.0
            } else {
                price / prices[i - 1].1 - 1.0
            };
            ReturnPoint::new(date, value)
        })
        .collect()
}

/// Resample to calendar period ends and take period-over-period changes.
fn resampled_returns(prices: &[(NaiveDate, f64)], granularity: Granularity) -> Vec<ReturnPoint> {
    let first_date = prices[0].0;
    let last_date = prices[prices.len() - 1].0;

    // Contiguous period boundaries from the first observation's period to
    // the one containing the last observation (possibly partial).
    let mut boundaries = Vec::new();
    let mut boundary = period_end(first_date, granularity);
    while boundary < last_date {
        boundaries.push(boundary);
        boundary = period_end(boundary + Duration::days(1), granularity);
    }
    boundaries.push(boundary);

    // Forward-fill: each boundary takes the last observation at or before
    // it. Periods with no observations of their own repeat the prior price,
    // which yields a zero return for that period.
    let mut sampled: Vec<(NaiveDate, f64)> = Vec::with_capacity(boundaries.len());
    let mut idx = 0;
    for &b in &boundaries {
        while idx < prices.len() && prices[idx].0 <= b {
            idx += 1;
        }
        sampled.push((b, prices[idx - 1].1));
    }

    let mut points: Vec<ReturnPoint> = sampled
        .iter()
        .enumerate()
        .map(|(i, &(date, price))| {
            let value = if i == 0 {
                0.0
            } else {
                price / sampled[i - 1].1 - 1.0
            };
            ReturnPoint::new(date, value)
        })
        .collect();

    // Pin the final element to the true last observation date so a partial
    // final period is dated where the data actually ends.
    if let Some(point) = points.last_mut() {
        point.date = last_date;
    }

    points
}
