//! Configuration file support for simulations.
//!
//! Allows loading simulation configurations from TOML files for
//! reproducibility.

use crate::allocation::{balanced_weights, AssetClass};
use crate::engine::SimulationConfig;
use crate::error::{FolioError, Result};
use crate::types::RebalancePolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Complete simulation configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationFileConfig {
    /// General simulation settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Allocation settings.
    #[serde(default)]
    pub allocation: AllocationSettings,
}

/// General simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Initial cash deposit.
    #[serde(default = "default_cash")]
    pub initial_cash: f64,
    /// Start date (YYYY-MM-DD format).
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD format).
    pub end_date: Option<String>,
    /// Rebalance policy ("never", "annually", "semi annually", "quarterly",
    /// "monthly", "weekly", "daily").
    #[serde(default = "default_policy")]
    pub policy: String,
    /// Use the adjusted close as the reference price.
    #[serde(default = "default_true")]
    pub use_adjusted: bool,
    /// Annualized risk-free rate used for the Sharpe ratio, as a fraction.
    #[serde(default)]
    pub risk_free_rate: f64,
}

fn default_cash() -> f64 {
    10_000.0
}
fn default_policy() -> String {
    "quarterly".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            start_date: None,
            end_date: None,
            policy: "quarterly".to_string(),
            use_adjusted: true,
            risk_free_rate: 0.0,
        }
    }
}

/// Data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory of per-ticker CSV files.
    #[serde(default = "default_data_dir")]
    pub dir: String,
    /// Date format in the CSV files.
    pub date_format: Option<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            date_format: None,
        }
    }
}

/// Allocation settings.
///
/// Either explicit percent `weights` per ticker, or a `classes` map from
/// ticker to asset class from which balanced weights are derived. Explicit
/// weights win when both are given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Explicit target weights, in percent of total value.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// Asset class per ticker, for a balanced allocation.
    #[serde(default)]
    pub classes: BTreeMap<String, AssetClass>,
}

impl SimulationFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: SimulationFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| FolioError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to a SimulationConfig for the engine.
    pub fn to_simulation_config(&self) -> Result<SimulationConfig> {
        let start_date = match &self.simulation.start_date {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            None => {
                return Err(FolioError::ConfigError(
                    "simulation.start_date is required".to_string(),
                ))
            }
        };
        let end_date = match &self.simulation.end_date {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            None => {
                return Err(FolioError::ConfigError(
                    "simulation.end_date is required".to_string(),
                ))
            }
        };
        if end_date <= start_date {
            return Err(FolioError::ConfigError(format!(
                "end_date {} must be after start_date {}",
                end_date, start_date
            )));
        }

        let policy = RebalancePolicy::from_str(&self.simulation.policy)?;

        Ok(SimulationConfig {
            initial_cash: self.simulation.initial_cash,
            start_date,
            end_date,
            policy,
            use_adjusted: self.simulation.use_adjusted,
            risk_free_rate: self.simulation.risk_free_rate,
        })
    }

    /// Resolve the target weights for this configuration.
    pub fn target_weights(&self) -> Result<BTreeMap<String, f64>> {
        if !self.allocation.weights.is_empty() {
            return Ok(self.allocation.weights.clone());
        }
        if !self.allocation.classes.is_empty() {
            return Ok(balanced_weights(&self.allocation.classes));
        }
        Err(FolioError::ConfigError(
            "allocation must define either weights or classes".to_string(),
        ))
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Folio Simulation Configuration File
# This file configures a portfolio simulation run

[simulation]
initial_cash = 10000.0
start_date = "2018-12-31"
end_date = "2023-12-31"
policy = "quarterly"
use_adjusted = true
risk_free_rate = 0.0

[data]
dir = "data"
# date_format = "%Y-%m-%d"

# Explicit percent weights (leave below 100 to hold the rest in cash):
[allocation.weights]
VOO = 55.0
BND = 35.0
GLD = 5.0

# Or derive a balanced allocation from asset classes instead:
# [allocation.classes]
# VOO = "stock"
# BND = "bond"
# BIL = "cash"
# GLD = "commodity"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SimulationFileConfig::default();
        assert_eq!(config.simulation.initial_cash, 10_000.0);
        assert_eq!(config.simulation.policy, "quarterly");
        assert!(config.simulation.use_adjusted);
    }

    #[test]
    fn test_load_config() {
        let toml_content = r#"
[simulation]
initial_cash = 50000.0
start_date = "2020-01-01"
end_date = "2022-12-31"
policy = "monthly"

[data]
dir = "prices"

[allocation.weights]
VOO = 60.0
BND = 40.0
"#;
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", toml_content).unwrap();

        let config = SimulationFileConfig::load(file.path()).unwrap();
        assert_eq!(config.simulation.initial_cash, 50000.0);
        assert_eq!(config.simulation.policy, "monthly");
        assert_eq!(config.data.dir, "prices");
        assert_eq!(config.allocation.weights["VOO"], 60.0);
    }

    #[test]
    fn test_to_simulation_config() {
        let mut config = SimulationFileConfig::default();
        config.simulation.start_date = Some("2020-01-01".to_string());
        config.simulation.end_date = Some("2021-01-01".to_string());
        config.simulation.policy = "semi annually".to_string();

        let sim = config.to_simulation_config().unwrap();
        assert_eq!(sim.policy, RebalancePolicy::SemiAnnually);
        assert_eq!(
            sim.start_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_missing_dates_rejected() {
        let config = SimulationFileConfig::default();
        assert!(config.to_simulation_config().is_err());
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut config = SimulationFileConfig::default();
        config.simulation.start_date = Some("2022-01-01".to_string());
        config.simulation.end_date = Some("2020-01-01".to_string());
        assert!(matches!(
            config.to_simulation_config(),
            Err(FolioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_target_weights_from_classes() {
        let mut config = SimulationFileConfig::default();
        config
            .allocation
            .classes
            .insert("VOO".to_string(), AssetClass::Stock);
        config
            .allocation
            .classes
            .insert("BND".to_string(), AssetClass::Bond);

        let weights = config.target_weights().unwrap();
        let total: f64 = weights.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_weights_win_over_classes() {
        let mut config = SimulationFileConfig::default();
        config.allocation.weights.insert("VOO".to_string(), 70.0);
        config
            .allocation
            .classes
            .insert("BND".to_string(), AssetClass::Bond);

        let weights = config.target_weights().unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights["VOO"], 70.0);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let mut config = SimulationFileConfig::default();
        config.simulation.start_date = Some("2020-01-01".to_string());
        config.simulation.end_date = Some("2021-01-01".to_string());
        config.allocation.weights.insert("VOO".to_string(), 55.0);

        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();

        let reloaded = SimulationFileConfig::load(file.path()).unwrap();
        assert_eq!(reloaded.simulation.start_date, config.simulation.start_date);
        assert_eq!(reloaded.allocation.weights["VOO"], 55.0);
    }

    #[test]
    fn test_example_parses() {
        let config: SimulationFileConfig =
            toml::from_str(&SimulationFileConfig::example()).unwrap();
        assert!(config.to_simulation_config().is_ok());
        assert!(!config.target_weights().unwrap().is_empty());
    }
}
