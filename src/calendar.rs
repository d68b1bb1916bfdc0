//! Pure date utilities: month boundaries, trading-date snapping and
//! rebalance-date generation.
//!
//! All snapping is backward-only (`<=` the target date). Snapping forward
//! would value the portfolio with price data that did not exist yet at the
//! rebalance date.

use crate::types::{Granularity, RebalancePolicy};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Included};

/// Last calendar day of the month containing `date`.
///
/// Jumps past the end of the month (day 28 + 4 days always lands in the next
/// month) and walks back to day zero of that month. Correct across 28/29/30/31
/// day months and leap years.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let next_month = date.with_day(28).expect("day 28 exists in every month") + Duration::days(4);
    next_month - Duration::days(next_month.day() as i64)
}

/// The maximum date in `available` that is `<= target`, or `None` if every
/// available date is later than `target`.
///
/// The comparison is inclusive: rebalancing on the exact target date when
/// data exists there is correct behavior.
pub fn closest_earlier_or_equal(
    target: NaiveDate,
    available: &BTreeSet<NaiveDate>,
) -> Option<NaiveDate> {
    available.range(..=target).next_back().copied()
}

/// Calendar end of the period containing `date` at the given granularity.
///
/// Conventions: annual = Dec 31, semi-annual = Jun 30 / Dec 31, quarterly =
/// quarter-end month, monthly = last day of month, weekly = Sunday of the
/// ISO week, daily/full = the date itself.
pub fn period_end(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Full | Granularity::Daily => date,
        Granularity::Weekly => {
            let days_to_sunday = 6 - date.weekday().num_days_from_monday() as i64;
            date + Duration::days(days_to_sunday)
        }
        Granularity::Monthly => last_day_of_month(date),
        Granularity::Quarterly => {
            let quarter_end_month = ((date.month() - 1) / 3) * 3 + 3;
            last_day_of_month(
                NaiveDate::from_ymd_opt(date.year(), quarter_end_month, 1)
                    .expect("quarter end month is valid"),
            )
        }
        Granularity::SemiAnnual => {
            let month = if date.month() <= 6 { 6 } else { 12 };
            last_day_of_month(
                NaiveDate::from_ymd_opt(date.year(), month, 1).expect("half end month is valid"),
            )
        }
        Granularity::Annual => {
            NaiveDate::from_ymd_opt(date.year(), 12, 31).expect("Dec 31 is valid")
        }
    }
}

/// Generate the ordered sequence of dates at which the portfolio resets to
/// target weights.
///
/// For `Never` the sequence is just `[end]`. Month-stepped policies advance
/// from `start` by the policy's step, snap each candidate to the last
/// calendar day of its month, then backward to the closest date in
/// `available`. `Weekly` advances by 7 days and `Daily` emits every
/// available date; both skip the month-end snap.
///
/// The start date itself is never emitted, no emitted date exceeds `end`,
/// the result is strictly increasing, and `end` is always the final element.
pub fn generate_rebalance_dates(
    start: NaiveDate,
    end: NaiveDate,
    policy: RebalancePolicy,
    available: &BTreeSet<NaiveDate>,
) -> Vec<NaiveDate> {
    if policy == RebalancePolicy::Never {
        return vec![end];
    }

    let mut dates: Vec<NaiveDate> = Vec::new();
    let push = |dates: &mut Vec<NaiveDate>, candidate: NaiveDate| {
        if candidate > start && candidate <= end && dates.last() != Some(&candidate) {
            debug_assert!(dates.last().map_or(true, |&last| candidate > last));
            dates.push(candidate);
        }
    };

    match policy.step_months() {
        Some(step) => {
            let mut cursor = start;
            loop {
                cursor = cursor + Months::new(step);
                if cursor > end {
                    break;
                }
                let month_end = last_day_of_month(cursor);
                // Stepping from the month end keeps short months from
                // drifting the sequence backwards.
                cursor = month_end;
                let snapped = closest_earlier_or_equal(month_end, available).unwrap_or(month_end);
                push(&mut dates, snapped);
            }
        }
        None if policy == RebalancePolicy::Weekly => {
            let mut cursor = start;
            loop {
                cursor += Duration::days(7);
                if cursor > end {
                    break;
                }
                let snapped = closest_earlier_or_equal(cursor, available).unwrap_or(cursor);
                push(&mut dates, snapped);
            }
        }
        None => {
            // Daily: every available trading date after start, up to end.
            for &date in available.range((Excluded(start), Included(end))) {
                push(&mut dates, date);
            }
        }
    }

    if dates.last() != Some(&end) {
        dates.push(end);
    }
    dates
}
