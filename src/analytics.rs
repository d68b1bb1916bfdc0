//! Performance analytics and reporting over a recorded value trajectory.

use crate::engine::SimulationResult;
use crate::types::TrajectoryPoint;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{builder::Builder, settings::Style};

/// Days per year used for annualization, mean Gregorian year.
const DAYS_PER_YEAR: f64 = 365.25;

/// Period-over-period percentage changes across consecutive trajectory
/// entries. Transitions from a zero value are skipped: there is no
/// meaningful relative change out of nothing.
fn percent_changes(trajectory: &[TrajectoryPoint]) -> Vec<f64> {
    trajectory
        .windows(2)
        .filter(|w| w[0].value != 0.0)
        .map(|w| w[1].value / w[0].value - 1.0)
        .collect()
}

fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Compound annual growth rate over the trajectory.
///
/// Returns a neutral 0 when CAGR is mathematically undefined: fewer than 2
/// entries, a non-positive starting value, or a non-positive time span.
pub fn cagr(trajectory: &[TrajectoryPoint]) -> f64 {
    if trajectory.len() < 2 {
        return 0.0;
    }
    let first = trajectory[0];
    let last = trajectory[trajectory.len() - 1];
    let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
    if first.value <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    (last.value / first.value).powf(1.0 / years) - 1.0
}

/// Sample standard deviation (n−1) of period-over-period changes.
/// Returns 0 with fewer than 2 valid changes.
pub fn stdev(trajectory: &[TrajectoryPoint]) -> f64 {
    sample_stdev(&percent_changes(trajectory))
}

/// Maximum drawdown as a positive fraction of the running peak.
pub fn max_drawdown(trajectory: &[TrajectoryPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for point in trajectory {
        peak = peak.max(point.value);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.value) / peak);
        }
    }
    max_dd
}

/// Sharpe ratio of period-over-period changes against `risk_free_rate`.
///
/// `None` with fewer than 2 entries; `NaN` when the change deviation is
/// zero (the ratio is undefined, and callers render it as such rather than
/// failing).
pub fn sharpe_ratio(trajectory: &[TrajectoryPoint], risk_free_rate: f64) -> Option<f64> {
    if trajectory.len() < 2 {
        return None;
    }
    let changes = percent_changes(trajectory);
    if changes.is_empty() {
        return None;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    let deviation = sample_stdev(&changes);
    if deviation == 0.0 {
        return Some(f64::NAN);
    }
    Some((mean - risk_free_rate) / deviation)
}

/// Summary statistics derived from one simulation's value trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Compound annual growth rate as a fraction.
    pub cagr: f64,
    /// Sample standard deviation of per-period changes.
    pub stdev: f64,
    /// Maximum drawdown as a positive fraction.
    pub max_drawdown: f64,
    /// Sharpe ratio; `None` for degenerate trajectories, `NaN` when the
    /// deviation is zero.
    pub sharpe_ratio: Option<f64>,
}

impl PerformanceSummary {
    pub fn from_trajectory(trajectory: &[TrajectoryPoint], risk_free_rate: f64) -> Self {
        Self {
            cagr: cagr(trajectory),
            stdev: stdev(trajectory),
            max_drawdown: max_drawdown(trajectory),
            sharpe_ratio: sharpe_ratio(trajectory, risk_free_rate),
        }
    }
}

/// Format simulation results for terminal display.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Print a full results report to stdout.
    pub fn print_report(result: &SimulationResult) {
        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " SIMULATION RESULTS ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();

        println!("{}", "Overview".bold().underline());
        println!("  Rebalancing:     {}", result.policy.label());
        println!(
            "  Period:          {} to {}",
            result.start_date, result.end_date
        );
        println!("  Instruments:     {}", result.tickers().join(", "));
        if !result.excluded.is_empty() {
            println!(
                "  Excluded (no data): {}",
                result.excluded.join(", ").yellow()
            );
        }
        println!();

        println!("{}", "Allocation".bold().underline());
        for (ticker, weight) in &result.weights {
            println!("  {:<12} {:>6.2}%", ticker, weight);
        }
        println!();

        println!("{}", "Performance".bold().underline());
        println!("  Initial Cash:    ${:>12.2}", result.initial_cash);
        println!(
            "  Final Value:     ${:>12.2}  {}",
            result.final_value,
            Self::format_pct_change(result.total_return_pct())
        );
        println!();

        println!("{}", "Risk Metrics".bold().underline());
        println!("  CAGR:            {:>12.2}%", result.summary.cagr * 100.0);
        println!("  Stdev:           {:>12.2}%", result.summary.stdev * 100.0);
        println!(
            "  Max Drawdown:    {:>12.2}%",
            result.summary.max_drawdown * 100.0
        );
        match result.summary.sharpe_ratio {
            Some(s) if s.is_finite() => println!("  Sharpe Ratio:    {:>12.2}", s),
            Some(_) => println!("  Sharpe Ratio:    {:>12}", "undefined"),
            None => println!("  Sharpe Ratio:    {:>12}", "n/a"),
        }
        println!();
        println!("{}", "═".repeat(60).blue());
    }

    /// Print the recorded trajectory as a table.
    pub fn print_trajectory(result: &SimulationResult) {
        let mut builder = Builder::new();
        builder.push_record(["Date", "Total Value"]);
        for point in &result.trajectory {
            builder.push_record([point.date.to_string(), format!("{:.2}", point.value)]);
        }
        let table = builder.build().with(Style::rounded()).to_string();
        println!("{}", table);
    }

    /// Print a comparison of several results as a table.
    pub fn print_comparison(results: &[SimulationResult]) {
        let mut builder = Builder::new();
        builder.push_record([
            "Policy",
            "Final Value",
            "CAGR %",
            "Stdev %",
            "Max DD %",
            "Sharpe",
        ]);

        for result in results {
            builder.push_record([
                result.policy.label().to_string(),
                format!("{:.2}", result.final_value),
                format!("{:.2}", result.summary.cagr * 100.0),
                format!("{:.2}", result.summary.stdev * 100.0),
                format!("{:.2}", result.summary.max_drawdown * 100.0),
                match result.summary.sharpe_ratio {
                    Some(s) if s.is_finite() => format!("{:.2}", s),
                    _ => "-".to_string(),
                },
            ]);
        }

        let table = builder.build().with(Style::rounded()).to_string();
        println!("{}", table);
    }

    /// Export a result to pretty JSON.
    pub fn to_json(result: &SimulationResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Export a result as one CSV line.
    pub fn to_csv_line(result: &SimulationResult) -> String {
        format!(
            "{},{:.2},{:.2},{:.6},{:.6},{:.6},{}",
            result.policy.label(),
            result.initial_cash,
            result.final_value,
            result.summary.cagr,
            result.summary.stdev,
            result.summary.max_drawdown,
            match result.summary.sharpe_ratio {
                Some(s) if s.is_finite() => format!("{:.6}", s),
                _ => String::new(),
            },
        )
    }

    /// CSV header matching [`ResultFormatter::to_csv_line`].
    pub fn csv_header() -> &'static str {
        "policy,initial_cash,final_value,cagr,stdev,max_drawdown,sharpe_ratio"
    }

    fn format_pct_change(pct: f64) -> String {
        if pct >= 0.0 {
            format!("(+{:.2}%)", pct).green().to_string()
        } else {
            format!("({:.2}%)", pct).red().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn trajectory(points: &[(NaiveDate, f64)]) -> Vec<TrajectoryPoint> {
        points
            .iter()
            .map(|&(date, value)| TrajectoryPoint::new(date, value))
            .collect()
    }

    #[test]
    fn test_cagr_one_year() {
        let t = trajectory(&[(d(2020, 1, 1), 10_000.0), (d(2021, 1, 1), 12_000.0)]);
        // ~1 year span, so CAGR is close to the 20% simple return.
        assert!((cagr(&t) - 0.20).abs() < 0.01);
    }

    #[test]
    fn test_cagr_two_years_compounds() {
        let t = trajectory(&[(d(2020, 1, 1), 10_000.0), (d(2022, 1, 1), 14_400.0)]);
        assert!((cagr(&t) - 0.20).abs() < 0.01);
    }

    #[test]
    fn test_cagr_degenerate_inputs_are_zero() {
        assert_eq!(cagr(&[]), 0.0);
        assert_eq!(cagr(&trajectory(&[(d(2020, 1, 1), 10_000.0)])), 0.0);
        // Non-positive start value
        assert_eq!(
            cagr(&trajectory(&[(d(2020, 1, 1), 0.0), (d(2021, 1, 1), 100.0)])),
            0.0
        );
    }

    #[test]
    fn test_stdev_skips_zero_prior_values() {
        let t = trajectory(&[
            (d(2021, 1, 1), 100.0),
            (d(2021, 2, 1), 0.0),
            (d(2021, 3, 1), 50.0),
            (d(2021, 4, 1), 55.0),
        ]);
        // The 0 -> 50 transition is dropped; changes are [-1.0, 0.1].
        let changes = [-1.0_f64, 0.1];
        let mean = (changes[0] + changes[1]) / 2.0;
        let expected = (changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / 1.0).sqrt();
        assert!((stdev(&t) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_stdev_insufficient_changes_is_zero() {
        assert_eq!(stdev(&[]), 0.0);
        assert_eq!(stdev(&trajectory(&[(d(2021, 1, 1), 100.0)])), 0.0);
        assert_eq!(
            stdev(&trajectory(&[(d(2021, 1, 1), 100.0), (d(2021, 2, 1), 110.0)])),
            0.0
        );
    }

    #[test]
    fn test_max_drawdown_running_peak() {
        let t = trajectory(&[
            (d(2021, 1, 1), 100.0),
            (d(2021, 2, 1), 120.0),
            (d(2021, 3, 1), 90.0),
            (d(2021, 4, 1), 110.0),
        ]);
        assert!((max_drawdown(&t) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdown_monotonic_growth_is_zero() {
        let t = trajectory(&[
            (d(2021, 1, 1), 100.0),
            (d(2021, 2, 1), 110.0),
            (d(2021, 3, 1), 125.0),
        ]);
        assert_eq!(max_drawdown(&t), 0.0);
    }

    #[test]
    fn test_sharpe_ratio_basic() {
        let t = trajectory(&[
            (d(2021, 1, 1), 100.0),
            (d(2021, 2, 1), 110.0),
            (d(2021, 3, 1), 99.0),
            (d(2021, 4, 1), 108.9),
        ]);
        let changes = [0.1_f64, -0.1, 0.1];
        let mean = changes.iter().sum::<f64>() / 3.0;
        let dev = sample_stdev(&changes);
        let expected = (mean - 0.02) / dev;
        let sharpe = sharpe_ratio(&t, 0.02).unwrap();
        assert!((sharpe - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_ratio_zero_deviation_is_nan() {
        let t = trajectory(&[
            (d(2021, 1, 1), 100.0),
            (d(2021, 2, 1), 110.0),
            (d(2021, 3, 1), 121.0),
        ]);
        // Constant 10% growth: zero deviation.
        assert!(sharpe_ratio(&t, 0.0).unwrap().is_nan());
    }

    #[test]
    fn test_single_entry_sentinels() {
        let t = trajectory(&[(d(2021, 1, 1), 100.0)]);
        assert_eq!(cagr(&t), 0.0);
        assert_eq!(stdev(&t), 0.0);
        assert!(sharpe_ratio(&t, 0.0).is_none());
    }

    #[test]
    fn test_summary_from_trajectory() {
        let t = trajectory(&[
            (d(2020, 1, 1), 10_000.0),
            (d(2020, 7, 1), 11_000.0),
            (d(2021, 1, 1), 12_000.0),
        ]);
        let summary = PerformanceSummary::from_trajectory(&t, 0.0);
        assert!(summary.cagr > 0.0);
        assert!(summary.stdev > 0.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert!(summary.sharpe_ratio.unwrap().is_finite());
    }
}
