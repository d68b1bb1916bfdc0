//! Core data types for the portfolio engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A single daily price observation for one instrument.
///
/// Only the two reference columns the engine needs are kept: the raw close
/// and the dividend/split adjusted close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub adj_close: f64,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, close: f64, adj_close: f64) -> Self {
        Self {
            date,
            close,
            adj_close,
        }
    }

    /// Select the reference price column.
    pub fn reference_price(&self, use_adjusted: bool) -> f64 {
        if use_adjusted {
            self.adj_close
        } else {
            self.close
        }
    }
}

/// Time resolution of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// One return covering the whole observation period.
    Full,
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl Granularity {
    /// All granularities a return series is built at.
    pub const ALL: [Granularity; 7] = [
        Granularity::Full,
        Granularity::Annual,
        Granularity::SemiAnnual,
        Granularity::Quarterly,
        Granularity::Monthly,
        Granularity::Weekly,
        Granularity::Daily,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Full => "full",
            Granularity::Annual => "annual",
            Granularity::SemiAnnual => "semi-annual",
            Granularity::Quarterly => "quarterly",
            Granularity::Monthly => "monthly",
            Granularity::Weekly => "weekly",
            Granularity::Daily => "daily",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Calendar rule governing how often a portfolio resets to target weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebalancePolicy {
    /// Exactly one rebalance event, at the end date.
    Never,
    Annually,
    SemiAnnually,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl RebalancePolicy {
    pub const ALL: [RebalancePolicy; 7] = [
        RebalancePolicy::Never,
        RebalancePolicy::Annually,
        RebalancePolicy::SemiAnnually,
        RebalancePolicy::Quarterly,
        RebalancePolicy::Monthly,
        RebalancePolicy::Weekly,
        RebalancePolicy::Daily,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RebalancePolicy::Never => "never",
            RebalancePolicy::Annually => "annually",
            RebalancePolicy::SemiAnnually => "semi annually",
            RebalancePolicy::Quarterly => "quarterly",
            RebalancePolicy::Monthly => "monthly",
            RebalancePolicy::Weekly => "weekly",
            RebalancePolicy::Daily => "daily",
        }
    }

    /// The return-series granularity this policy reads from.
    pub fn granularity(&self) -> Granularity {
        match self {
            RebalancePolicy::Never => Granularity::Full,
            RebalancePolicy::Annually => Granularity::Annual,
            RebalancePolicy::SemiAnnually => Granularity::SemiAnnual,
            RebalancePolicy::Quarterly => Granularity::Quarterly,
            RebalancePolicy::Monthly => Granularity::Monthly,
            RebalancePolicy::Weekly => Granularity::Weekly,
            RebalancePolicy::Daily => Granularity::Daily,
        }
    }

    /// Calendar step in months for month-stepped policies.
    ///
    /// `None` for `Never` (single event), `Weekly` and `Daily` (sub-monthly
    /// steps, see `calendar::generate_rebalance_dates`).
    pub fn step_months(&self) -> Option<u32> {
        match self {
            RebalancePolicy::Annually => Some(12),
            RebalancePolicy::SemiAnnually => Some(6),
            RebalancePolicy::Quarterly => Some(3),
            RebalancePolicy::Monthly => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for RebalancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RebalancePolicy {
    type Err = crate::error::FolioError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "never" => Ok(RebalancePolicy::Never),
            "annually" | "yearly" => Ok(RebalancePolicy::Annually),
            "semi annually" | "semiannually" => Ok(RebalancePolicy::SemiAnnually),
            "quarterly" => Ok(RebalancePolicy::Quarterly),
            "monthly" => Ok(RebalancePolicy::Monthly),
            "weekly" => Ok(RebalancePolicy::Weekly),
            "daily" => Ok(RebalancePolicy::Daily),
            other => Err(crate::error::FolioError::ConfigError(format!(
                "Unknown rebalance policy: '{}'",
                other
            ))),
        }
    }
}

/// One observation of a return series: the fractional return of the
/// instrument's reference price relative to the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl ReturnPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Return series for one instrument at every granularity.
///
/// Within one granularity the dates are strictly increasing, and the final
/// entry is always dated at the last available observation in the source
/// history. The series is read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ReturnSeries {
    series: HashMap<Granularity, Vec<ReturnPoint>>,
}

impl ReturnSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, granularity: Granularity, points: Vec<ReturnPoint>) {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        self.series.insert(granularity, points);
    }

    /// Get the full sequence at one granularity.
    pub fn get(&self, granularity: Granularity) -> Option<&[ReturnPoint]> {
        self.series.get(&granularity).map(|v| v.as_slice())
    }

    /// Look up the return at `as_of`: an exact match if the date is present,
    /// otherwise the most recent prior entry. `None` if every entry is later
    /// than `as_of` or the granularity is absent.
    pub fn return_at(&self, granularity: Granularity, as_of: NaiveDate) -> Option<f64> {
        let points = self.series.get(&granularity)?;
        let idx = points.partition_point(|p| p.date <= as_of);
        if idx == 0 {
            None
        } else {
            Some(points[idx - 1].value)
        }
    }

    /// Compound growth over every entry dated in `(after, through]`.
    ///
    /// Consecutive calls over adjacent windows partition the series: no
    /// entry is ever counted twice and none is skipped, even when the
    /// window edges fall between entries. An empty window is `Some(0.0)`;
    /// `None` only if the granularity is absent.
    pub fn compound_between(
        &self,
        granularity: Granularity,
        after: NaiveDate,
        through: NaiveDate,
    ) -> Option<f64> {
        let points = self.series.get(&granularity)?;
        let lo = points.partition_point(|p| p.date <= after);
        let hi = points.partition_point(|p| p.date <= through);
        let growth = points[lo..hi]
            .iter()
            .fold(1.0, |acc, p| acc * (1.0 + p.value));
        Some(growth - 1.0)
    }

    /// Dates of the daily series, i.e. the instrument's trading dates.
    pub fn daily_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.series
            .get(&Granularity::Daily)
            .into_iter()
            .flatten()
            .map(|p| p.date)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Total portfolio value recorded at one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TrajectoryPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}
