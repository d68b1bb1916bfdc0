//! Folio - A portfolio valuation and rebalancing engine.
//!
//! # Overview
//!
//! Folio simulates multi-asset portfolios over historical price data:
//! allocate target weights across instruments, fund the portfolio with an
//! initial cash deposit, and replay its value through time under a chosen
//! rebalancing policy.
//!
//! - **Return series**: per-instrument returns at seven granularities, from
//!   one full-window return down to daily changes
//! - **Calendar engine**: month-end aware rebalance schedules snapped to
//!   actual trading days
//! - **Rebalancing policies**: never, annually, semi-annually, quarterly,
//!   monthly, weekly, daily
//! - **Performance analytics**: CAGR, volatility, maximum drawdown, Sharpe
//! - **Balanced allocations**: derive target weights from asset classes
//! - **Configuration files**: TOML-based configuration for reproducible runs
//!
//! # Quick Start
//!
//! ```no_run
//! use folio::{
//!     data::load_csv,
//!     engine::{Engine, SimulationConfig},
//!     types::RebalancePolicy,
//! };
//! use std::collections::BTreeMap;
//!
//! let config = SimulationConfig {
//!     initial_cash: 10_000.0,
//!     policy: RebalancePolicy::Quarterly,
//!     ..Default::default()
//! };
//! let mut engine = Engine::new(config);
//!
//! let records = load_csv("data/VOO.csv", &Default::default()).unwrap();
//! engine.add_data("VOO", records);
//!
//! let mut weights = BTreeMap::new();
//! weights.insert("VOO".to_string(), 80.0);
//!
//! let result = engine.run(&weights).unwrap();
//! println!("Return: {:.2}%", result.total_return_pct());
//! println!("CAGR:   {:.2}%", result.summary.cagr * 100.0);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core data types (PriceRecord, Granularity, RebalancePolicy)
//! - [`calendar`]: Month-end arithmetic and rebalance date generation
//! - [`returns`]: Return-series construction from price history
//! - [`portfolio`]: Portfolio state, allocation, and rebalancing
//! - [`analytics`]: Performance metrics and reporting
//! - [`allocation`]: Balanced target weights from asset classes
//! - [`data`]: CSV price-history loading and price sources
//! - [`engine`]: Simulation engine and policy comparison
//! - [`config`]: TOML configuration file support

pub mod allocation;
pub mod analytics;
pub mod calendar;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod portfolio;
pub mod returns;
pub mod types;

// Re-exports for convenience
pub use allocation::{balanced_weights, AssetClass};
pub use analytics::{
    cagr, max_drawdown, sharpe_ratio, stdev, PerformanceSummary, ResultFormatter,
};
pub use calendar::{closest_earlier_or_equal, generate_rebalance_dates, last_day_of_month};
pub use config::SimulationFileConfig;
pub use data::{load_csv, CsvDirSource, DataConfig, PriceSource};
pub use engine::{Engine, SimulationConfig, SimulationResult};
pub use error::{FolioError, Result};
pub use portfolio::{Portfolio, CASH};
pub use returns::build_returns;
pub use types::{
    Granularity, PriceRecord, RebalancePolicy, ReturnPoint, ReturnSeries, TrajectoryPoint,
};
