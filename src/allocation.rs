//! Target-weight construction from asset classes.
//!
//! Builds a balanced allocation from a classification of tickers into broad
//! asset classes: each class gets a fixed share of the portfolio, shares for
//! absent classes are redistributed proportionally, and a class's share is
//! split evenly across its tickers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broad asset class of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Bond,
    Cash,
    Commodity,
}

impl AssetClass {
    /// Default target share of the portfolio, as a fraction.
    pub fn target_ratio(&self) -> f64 {
        match self {
            AssetClass::Stock => 0.55,
            AssetClass::Bond => 0.35,
            AssetClass::Cash => 0.05,
            AssetClass::Commodity => 0.05,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Bond => "bond",
            AssetClass::Cash => "cash",
            AssetClass::Commodity => "commodity",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Derive balanced target weights (percent) from a ticker → asset-class map.
///
/// Only classes that are actually present contribute; their default ratios
/// are renormalized to sum to 100%, and each class's share is distributed
/// evenly among its tickers. An empty classification yields empty weights
/// (everything stays in cash).
pub fn balanced_weights(classes: &BTreeMap<String, AssetClass>) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<AssetClass, usize> = BTreeMap::new();
    for class in classes.values() {
        *counts.entry(*class).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return BTreeMap::new();
    }

    let total_ratio: f64 = counts.keys().map(|c| c.target_ratio()).sum();

    classes
        .iter()
        .map(|(ticker, class)| {
            let class_share = class.target_ratio() / total_ratio * 100.0;
            let per_ticker = class_share / counts[class] as f64;
            (ticker.clone(), per_ticker)
        })
        .collect()
}

impl Ord for AssetClass {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.label().cmp(other.label())
    }
}

impl PartialOrd for AssetClass {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
