//! Simulation engine tying data, portfolio, and analytics together.

use crate::analytics::PerformanceSummary;
use crate::data::PriceSource;
use crate::error::Result;
use crate::portfolio::Portfolio;
use crate::returns::build_returns;
use crate::types::{PriceRecord, RebalancePolicy, TrajectoryPoint};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Initial cash deposit.
    pub initial_cash: f64,
    /// First day of the simulation window.
    pub start_date: NaiveDate,
    /// Last day of the simulation window.
    pub end_date: NaiveDate,
    /// When the portfolio is rebalanced back to its target weights.
    pub policy: RebalancePolicy,
    /// Use the adjusted close as the reference price.
    pub use_adjusted: bool,
    /// Annualized risk-free rate for the Sharpe ratio, as a fraction.
    pub risk_free_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            start_date: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            policy: RebalancePolicy::Quarterly,
            use_adjusted: true,
            risk_free_rate: 0.0,
        }
    }
}

/// Result of a single simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Rebalance policy the run used.
    pub policy: RebalancePolicy,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    /// Total portfolio value at the end of the run.
    pub final_value: f64,
    /// Target weights actually applied, in percent.
    pub weights: BTreeMap<String, f64>,
    /// Tickers dropped for lack of price data in the window.
    pub excluded: Vec<String>,
    /// Final per-instrument balances, including cash.
    pub funds: BTreeMap<String, f64>,
    /// Total value after each rebalance step.
    pub trajectory: Vec<TrajectoryPoint>,
    /// Performance statistics over the trajectory.
    pub summary: PerformanceSummary,
}

impl SimulationResult {
    /// Tickers the run actually held, in weight order.
    pub fn tickers(&self) -> Vec<String> {
        self.weights.keys().cloned().collect()
    }

    /// Total return over the run, in percent.
    pub fn total_return_pct(&self) -> f64 {
        if self.initial_cash == 0.0 {
            return 0.0;
        }
        (self.final_value / self.initial_cash - 1.0) * 100.0
    }
}

/// Portfolio simulation engine.
///
/// Holds raw price history per ticker and runs rebalancing simulations over
/// it. Tickers with no price data inside the simulation window are excluded
/// from the run (with a warning) rather than failing it.
#[derive(Debug, Default)]
pub struct Engine {
    config: SimulationConfig,
    data: BTreeMap<String, Vec<PriceRecord>>,
}

impl Engine {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            data: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Add pre-loaded price history for a ticker.
    pub fn add_data(&mut self, ticker: impl Into<String>, records: Vec<PriceRecord>) {
        self.data.insert(ticker.into(), records);
    }

    /// Fetch price history for each ticker from a [`PriceSource`].
    pub fn load_from_source<S: PriceSource>(
        &mut self,
        source: &S,
        tickers: &[String],
    ) -> Result<()> {
        for ticker in tickers {
            let records =
                source.fetch_price_history(ticker, self.config.start_date, self.config.end_date)?;
            debug!("Fetched {} records for {}", records.len(), ticker);
            self.data.insert(ticker.clone(), records);
        }
        Ok(())
    }

    /// Run one simulation with the configured policy.
    ///
    /// `weights` are target percent allocations per ticker. Weights for
    /// tickers without price data are dropped (the freed share stays in
    /// cash); everything else is allocated, funded with the initial cash,
    /// and rebalanced across the window.
    pub fn run(&self, weights: &BTreeMap<String, f64>) -> Result<SimulationResult> {
        self.run_with_policy(weights, self.config.policy)
    }

    /// Run one simulation with an explicit policy override.
    pub fn run_with_policy(
        &self,
        weights: &BTreeMap<String, f64>,
        policy: RebalancePolicy,
    ) -> Result<SimulationResult> {
        info!(
            "Running simulation: {} from {} to {}",
            policy.label(),
            self.config.start_date,
            self.config.end_date
        );

        let mut series = BTreeMap::new();
        let mut excluded = Vec::new();
        for ticker in weights.keys() {
            let records = self.data.get(ticker).map(Vec::as_slice).unwrap_or(&[]);
            if records.is_empty() {
                warn!("Excluding {}: no price data in simulation window", ticker);
                excluded.push(ticker.clone());
                continue;
            }
            series.insert(
                ticker.clone(),
                build_returns(records, self.config.use_adjusted)?,
            );
        }

        let applied: BTreeMap<String, f64> = weights
            .iter()
            .filter(|(ticker, _)| series.contains_key(*ticker))
            .map(|(ticker, weight)| (ticker.clone(), *weight))
            .collect();

        let mut portfolio = Portfolio::new(
            applied.keys().cloned(),
            self.config.start_date,
            self.config.end_date,
            policy,
        );
        for (ticker, s) in series {
            portfolio.set_return_series(ticker, s);
        }

        portfolio.allocate(&applied)?;
        portfolio.balance(self.config.initial_cash);
        portfolio.rebalance()?;

        let final_value = portfolio.total_balance();
        let trajectory = portfolio.trajectory().to_vec();
        let summary = PerformanceSummary::from_trajectory(&trajectory, self.config.risk_free_rate);

        info!(
            "Simulation complete: final value {:.2} ({} rebalance points)",
            final_value,
            trajectory.len()
        );

        Ok(SimulationResult {
            policy,
            start_date: self.config.start_date,
            end_date: self.config.end_date,
            initial_cash: self.config.initial_cash,
            final_value,
            weights: applied,
            excluded,
            funds: portfolio.funds().clone(),
            trajectory,
            summary,
        })
    }

    /// Run the same allocation under several policies in parallel.
    ///
    /// Results come back in the order the policies were given.
    pub fn compare_policies(
        &self,
        weights: &BTreeMap<String, f64>,
        policies: &[RebalancePolicy],
    ) -> Result<Vec<SimulationResult>> {
        policies
            .par_iter()
            .map(|&policy| self.run_with_policy(weights, policy))
            .collect()
    }
}
