//! Command-line interface for the portfolio engine.

use folio::analytics::ResultFormatter;
use folio::config::SimulationFileConfig;
use folio::data::{load_csv, CsvDirSource, DataConfig, PriceSource};
use folio::engine::{Engine, SimulationConfig};
use folio::error::{FolioError, Result};
use folio::types::RebalancePolicy;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Folio - A portfolio valuation and rebalancing engine.
#[derive(Parser)]
#[command(name = "folio")]
#[command(author = "Johan")]
#[command(version = "1.0.0")]
#[command(about = "Simulate multi-asset portfolios under rebalancing policies")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a simulation over a directory of per-ticker CSV files
    Run {
        /// Directory containing <TICKER>.csv price files
        #[arg(short, long)]
        data: PathBuf,

        /// Target weight per ticker, e.g. -w VOO=55 -w BND=35
        #[arg(short, long = "weight", value_name = "TICKER=PCT")]
        weights: Vec<String>,

        /// Rebalance policy
        #[arg(short, long, default_value = "quarterly")]
        policy: String,

        /// Initial cash deposit
        #[arg(short, long, default_value = "10000")]
        cash: f64,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: NaiveDate,

        /// Use the raw close instead of the adjusted close
        #[arg(long)]
        raw_close: bool,

        /// Print the value trajectory as well
        #[arg(long)]
        trajectory: bool,
    },

    /// Run every rebalance policy over the same allocation and compare
    Compare {
        /// Directory containing <TICKER>.csv price files
        #[arg(short, long)]
        data: PathBuf,

        /// Target weight per ticker, e.g. -w VOO=55 -w BND=35
        #[arg(short, long = "weight", value_name = "TICKER=PCT")]
        weights: Vec<String>,

        /// Initial cash deposit
        #[arg(short, long, default_value = "10000")]
        cash: f64,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: NaiveDate,
    },

    /// Validate a price CSV file
    Validate {
        /// Path to CSV price file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "folio.toml")]
        output: PathBuf,
    },

    /// Run a simulation from a configuration file
    RunConfig {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// Parse repeated `TICKER=PCT` weight arguments.
fn parse_weights(args: &[String]) -> Result<BTreeMap<String, f64>> {
    let mut weights = BTreeMap::new();
    for arg in args {
        let (ticker, pct) = arg.split_once('=').ok_or_else(|| {
            FolioError::ConfigError(format!("Invalid weight '{}', expected TICKER=PCT", arg))
        })?;
        let pct: f64 = pct.parse().map_err(|_| {
            FolioError::ConfigError(format!("Invalid weight percentage in '{}'", arg))
        })?;
        weights.insert(ticker.trim().to_string(), pct);
    }
    if weights.is_empty() {
        return Err(FolioError::ConfigError(
            "At least one -w TICKER=PCT weight is required".to_string(),
        ));
    }
    Ok(weights)
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Run {
            data,
            weights,
            policy,
            cash,
            start,
            end,
            raw_close,
            trajectory,
        } => run_simulation(
            data,
            weights,
            policy,
            *cash,
            *start,
            *end,
            *raw_close,
            *trajectory,
            cli.output,
        ),

        Commands::Compare {
            data,
            weights,
            cash,
            start,
            end,
        } => run_comparison(data, weights, *cash, *start, *end, cli.output),

        Commands::Validate { data } => validate_data(data),

        Commands::Init { output } => init_config(output),

        Commands::RunConfig { config } => run_from_config(config, cli.output),
    }
}

fn build_engine(
    data_dir: &PathBuf,
    weights: &BTreeMap<String, f64>,
    config: SimulationConfig,
) -> Result<Engine> {
    let source = CsvDirSource::new(data_dir);
    let tickers: Vec<String> = weights.keys().cloned().collect();
    let mut engine = Engine::new(config);
    engine.load_from_source(&source, &tickers)?;
    Ok(engine)
}

#[allow(clippy::too_many_arguments)]
fn run_simulation(
    data_dir: &PathBuf,
    weight_args: &[String],
    policy: &str,
    cash: f64,
    start: NaiveDate,
    end: NaiveDate,
    raw_close: bool,
    trajectory: bool,
    output: OutputFormat,
) -> Result<()> {
    let weights = parse_weights(weight_args)?;
    let policy = RebalancePolicy::from_str(policy)?;

    let config = SimulationConfig {
        initial_cash: cash,
        start_date: start,
        end_date: end,
        policy,
        use_adjusted: !raw_close,
        risk_free_rate: 0.0,
    };

    let engine = build_engine(data_dir, &weights, config)?;
    let result = engine.run(&weights)?;

    match output {
        OutputFormat::Text => {
            ResultFormatter::print_report(&result);
            if trajectory {
                ResultFormatter::print_trajectory(&result);
            }
        }
        OutputFormat::Json => println!("{}", ResultFormatter::to_json(&result)),
        OutputFormat::Csv => {
            println!("{}", ResultFormatter::csv_header());
            println!("{}", ResultFormatter::to_csv_line(&result));
        }
    }

    Ok(())
}

fn run_comparison(
    data_dir: &PathBuf,
    weight_args: &[String],
    cash: f64,
    start: NaiveDate,
    end: NaiveDate,
    output: OutputFormat,
) -> Result<()> {
    let weights = parse_weights(weight_args)?;

    let config = SimulationConfig {
        initial_cash: cash,
        start_date: start,
        end_date: end,
        policy: RebalancePolicy::Never,
        use_adjusted: true,
        risk_free_rate: 0.0,
    };

    let engine = build_engine(data_dir, &weights, config)?;

    info!("Comparing {} rebalance policies", RebalancePolicy::ALL.len());
    let results = engine.compare_policies(&weights, &RebalancePolicy::ALL)?;

    match output {
        OutputFormat::Text => ResultFormatter::print_comparison(&results),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Csv => {
            println!("{}", ResultFormatter::csv_header());
            for result in &results {
                println!("{}", ResultFormatter::to_csv_line(result));
            }
        }
    }

    Ok(())
}

fn validate_data(data_path: &PathBuf) -> Result<()> {
    println!("Validating price file: {}", data_path.display());

    let records = load_csv(data_path, &DataConfig::default())?;

    println!("\nData Summary:");
    println!("  Rows: {}", records.len());

    if !records.is_empty() {
        println!("  Start: {}", records.first().unwrap().date);
        println!("  End: {}", records.last().unwrap().date);

        let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
        let min_price = closes.iter().fold(f64::INFINITY, |a: f64, &b| a.min(b));
        let max_price = closes.iter().fold(f64::NEG_INFINITY, |a: f64, &b| a.max(b));
        let avg_price: f64 = closes.iter().sum::<f64>() / closes.len() as f64;

        println!("  Price Range: {:.2} - {:.2}", min_price, max_price);
        println!("  Average Price: {:.2}", avg_price);

        let non_positive = closes.iter().filter(|&&c| c <= 0.0).count();
        if non_positive > 0 {
            println!("  WARNING: {} non-positive prices", non_positive);
        }
    }

    println!("\nValidation: PASSED");
    Ok(())
}

fn init_config(output: &PathBuf) -> Result<()> {
    let example = SimulationFileConfig::example();
    fs::write(output, example)?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to customize your simulation, then run:");
    println!("  folio run-config -c {}", output.display());
    Ok(())
}

fn run_from_config(config_path: &PathBuf, output: OutputFormat) -> Result<()> {
    info!("Loading configuration from: {}", config_path.display());

    let file_config = SimulationFileConfig::load(config_path)?;
    let sim_config = file_config.to_simulation_config()?;
    let weights = file_config.target_weights()?;

    let source = CsvDirSource::with_config(
        &file_config.data.dir,
        DataConfig {
            date_format: file_config.data.date_format.clone(),
            ..Default::default()
        },
    );
    let tickers: Vec<String> = weights.keys().cloned().collect();

    let mut engine = Engine::new(sim_config);
    engine.load_from_source(&source, &tickers)?;

    let result = engine.run(&weights)?;

    match output {
        OutputFormat::Text => ResultFormatter::print_report(&result),
        OutputFormat::Json => println!("{}", ResultFormatter::to_json(&result)),
        OutputFormat::Csv => {
            println!("{}", ResultFormatter::csv_header());
            println!("{}", ResultFormatter::to_csv_line(&result));
        }
    }

    Ok(())
}
