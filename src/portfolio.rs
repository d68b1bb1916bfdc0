//! Portfolio state: per-instrument fund balances, target allocation,
//! valuation and rebalancing.
//!
//! A `Portfolio` owns its funds, allocation and value trajectory for its
//! lifetime. Return series are supplied by the caller (see
//! [`crate::returns::build_returns`]) and are only ever read from.
//!
//! Valuation is split into a pure query ([`Portfolio::peek_total_value`])
//! and an explicit mutation ([`Portfolio::apply_growth`]) so that reading
//! the portfolio value twice can never compound growth twice.

use crate::calendar::generate_rebalance_dates;
use crate::error::{FolioError, Result};
use crate::types::{Granularity, RebalancePolicy, ReturnSeries, TrajectoryPoint};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

/// Reserved instrument identifier for uninvested cash.
pub const CASH: &str = "cash";

/// Tolerance for allocation-sum comparison against 100%.
const ALLOCATION_EPS: f64 = 1e-9;

/// A multi-asset portfolio advancing through time under a rebalance policy.
#[derive(Debug, Clone)]
pub struct Portfolio {
    /// Current monetary balance per instrument. Keys are fixed at
    /// construction; `"cash"` is always present.
    funds: BTreeMap<String, f64>,
    /// Target weight in percent per instrument.
    allocations: BTreeMap<String, f64>,
    /// Read-only return series per instrument.
    return_series: BTreeMap<String, ReturnSeries>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    current_date: NaiveDate,
    policy: RebalancePolicy,
    /// Total value per date, appended strictly in date order.
    trajectory: Vec<TrajectoryPoint>,
}

impl Portfolio {
    /// Create a portfolio holding the given tickers plus cash, all balances
    /// zero and all weights zero.
    pub fn new<I, S>(
        tickers: I,
        start_date: NaiveDate,
        end_date: NaiveDate,
        policy: RebalancePolicy,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut funds: BTreeMap<String, f64> =
            tickers.into_iter().map(|t| (t.into(), 0.0)).collect();
        funds.insert(CASH.to_string(), 0.0);
        let allocations = funds.keys().map(|t| (t.clone(), 0.0)).collect();

        Self {
            funds,
            allocations,
            return_series: BTreeMap::new(),
            start_date,
            end_date,
            current_date: start_date,
            policy,
            trajectory: Vec::new(),
        }
    }

    /// Attach the return series for one instrument.
    pub fn set_return_series(&mut self, ticker: impl Into<String>, series: ReturnSeries) {
        self.return_series.insert(ticker.into(), series);
    }

    pub fn funds(&self) -> &BTreeMap<String, f64> {
        &self.funds
    }

    pub fn allocations(&self) -> &BTreeMap<String, f64> {
        &self.allocations
    }

    pub fn trajectory(&self) -> &[TrajectoryPoint] {
        &self.trajectory
    }

    pub fn policy(&self) -> RebalancePolicy {
        self.policy
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// Sum of all balances, cash included.
    pub fn total_balance(&self) -> f64 {
        self.funds.values().sum()
    }

    /// Set the target allocation, replacing any prior allocation wholesale.
    ///
    /// Weights are percentages in `[0, 100]`; the residual `100 − Σweights`
    /// is implicitly cash's share. Fails with
    /// [`FolioError::OverAllocation`] if the weights sum above 100.
    pub fn allocate(&mut self, weights: &BTreeMap<String, f64>) -> Result<()> {
        let total: f64 = weights.values().sum();
        if total > 100.0 + ALLOCATION_EPS {
            return Err(FolioError::OverAllocation { total });
        }
        if let Some((ticker, &w)) = weights.iter().find(|(_, &w)| w < 0.0) {
            return Err(FolioError::ConfigError(format!(
                "negative allocation weight {} for {}",
                w, ticker
            )));
        }

        self.allocations = self
            .funds
            .keys()
            .map(|t| (t.clone(), weights.get(t).copied().unwrap_or(0.0)))
            .collect();
        Ok(())
    }

    /// Distribute `cash_amount` across instruments per the current
    /// allocation and record the resulting total in the trajectory at the
    /// current date. Unallocated weight stays in cash.
    pub fn balance(&mut self, cash_amount: f64) {
        let allocated: f64 = self
            .allocations
            .iter()
            .filter(|(t, _)| t.as_str() != CASH)
            .map(|(_, w)| w)
            .sum();

        for (ticker, balance) in self.funds.iter_mut() {
            // Cash absorbs everything not allocated to instruments; an
            // explicit cash weight is already part of that remainder.
            let weight = if ticker == CASH {
                100.0 - allocated
            } else {
                self.allocations.get(ticker).copied().unwrap_or(0.0)
            };
            *balance = cash_amount * weight / 100.0;
        }

        let total = self.total_balance();
        self.record_value(self.current_date, total);
        debug!(
            date = %self.current_date,
            total = total,
            "balanced portfolio to target weights"
        );
    }

    /// Total portfolio value at `as_of` without touching any balance.
    ///
    /// Each non-cash instrument with a non-zero balance is grown by its
    /// return at `as_of` (exact date match, else the most recent prior
    /// entry; no entry at or before `as_of` means zero growth). An
    /// instrument holding a balance but missing its return series entirely
    /// fails with [`FolioError::MissingTickerData`]; instruments with zero
    /// balance are skipped, so excluded instruments never error.
    pub fn peek_total_value(&self, granularity: Granularity, as_of: NaiveDate) -> Result<f64> {
        let mut total = 0.0;
        for (ticker, &balance) in &self.funds {
            if ticker == CASH {
                total += balance;
                continue;
            }
            if balance == 0.0 {
                continue;
            }
            let growth = self.growth_at(ticker, granularity, as_of)?;
            total += balance * (1.0 + growth);
        }
        Ok(total)
    }

    /// Compound each instrument's balance in place by all of its returns
    /// dated in `(after, through]` and return the new total value.
    ///
    /// Window-based on purpose: rebalance dates get snapped backward to
    /// trading days, so a point lookup at the snapped date could re-apply
    /// the prior period's return and skip the one straddling the snap.
    /// Adjacent windows partition the series instead. Repeated calls over
    /// the same window compound again; use
    /// [`Portfolio::peek_total_value`] for a read-only valuation.
    pub fn apply_growth(
        &mut self,
        granularity: Granularity,
        after: NaiveDate,
        through: NaiveDate,
    ) -> Result<f64> {
        let mut growths: Vec<(String, f64)> = Vec::with_capacity(self.funds.len());
        for (ticker, &balance) in &self.funds {
            if ticker == CASH || balance == 0.0 {
                continue;
            }
            growths.push((
                ticker.clone(),
                self.growth_between(ticker, granularity, after, through)?,
            ));
        }

        for (ticker, growth) in growths {
            if let Some(balance) = self.funds.get_mut(&ticker) {
                *balance *= 1.0 + growth;
            }
        }
        Ok(self.total_balance())
    }

    /// Walk the rebalance date sequence: at each date, grow balances to
    /// that date and redistribute the proceeds back to target weights. Each
    /// rebalance point lands in the trajectory.
    pub fn rebalance(&mut self) -> Result<()> {
        let available: BTreeSet<NaiveDate> = self
            .return_series
            .values()
            .flat_map(|s| s.daily_dates())
            .collect();

        let dates = generate_rebalance_dates(
            self.start_date,
            self.end_date,
            self.policy,
            &available,
        );
        info!(
            policy = %self.policy,
            events = dates.len(),
            "rebalancing from {} to {}",
            self.start_date,
            self.end_date
        );

        let granularity = self.policy.granularity();
        let mut prev = self.start_date;
        for date in dates {
            self.current_date = date;
            let total = self.apply_growth(granularity, prev, date)?;
            self.balance(total);
            prev = date;
        }
        Ok(())
    }

    fn growth_at(&self, ticker: &str, granularity: Granularity, as_of: NaiveDate) -> Result<f64> {
        let series = self
            .return_series
            .get(ticker)
            .ok_or_else(|| FolioError::MissingTickerData(ticker.to_string()))?;
        Ok(series.return_at(granularity, as_of).unwrap_or(0.0))
    }

    fn growth_between(
        &self,
        ticker: &str,
        granularity: Granularity,
        after: NaiveDate,
        through: NaiveDate,
    ) -> Result<f64> {
        let series = self
            .return_series
            .get(ticker)
            .ok_or_else(|| FolioError::MissingTickerData(ticker.to_string()))?;
        Ok(series
            .compound_between(granularity, after, through)
            .unwrap_or(0.0))
    }

    /// Append to the trajectory, keeping dates strictly increasing. A
    /// second value recorded at the same date replaces the first (a
    /// zero-length simulation balances and rebalances on the same day).
    fn record_value(&mut self, date: NaiveDate, value: f64) {
        match self.trajectory.last_mut() {
            Some(last) if last.date == date => last.value = value,
            Some(last) => {
                debug_assert!(date > last.date);
                self.trajectory.push(TrajectoryPoint::new(date, value));
            }
            None => self.trajectory.push(TrajectoryPoint::new(date, value)),
        }
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allocation: Vec<String> = self
            .allocations
            .iter()
            .filter(|(_, &w)| w > 0.0)
            .map(|(t, w)| format!("{}: {}%", t, w))
            .collect();
        write!(
            f,
            "Portfolio Allocation: {}, Total Value: {:.2}",
            allocation.join(", "),
            self.total_balance()
        )
    }
}
