//! Price-history loading for the simulation engine.

use crate::error::{FolioError, Result};
use crate::types::PriceRecord;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Raw CSV row with flexible column naming.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "date", alias = "DATE")]
    date: String,
    #[serde(alias = "Close", alias = "close", alias = "c")]
    close: f64,
    #[serde(
        alias = "Adj Close",
        alias = "adj_close",
        alias = "Adj_Close",
        alias = "AdjClose",
        default
    )]
    adj_close: Option<f64>,
}

/// Data source configuration.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string for parsing (e.g., "%Y-%m-%d").
    pub date_format: Option<String>,
    /// Whether the CSV has headers.
    pub has_headers: bool,
    /// Skip invalid rows instead of failing.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            has_headers: true,
            skip_invalid: true,
        }
    }
}

/// Parse a date string with multiple format attempts.
fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    if let Some(fmt) = format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%d-%b-%Y",  // 15-Jan-2024
        "%b %d, %Y", // Jan 15, 2024
    ];

    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    // Timestamps with a time component: keep the date part.
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }

    Err(FolioError::DataError(format!(
        "Could not parse date: '{}'",
        s
    )))
}

/// Load daily price records from a CSV file.
///
/// Rows are sorted by date and duplicate dates are dropped. A missing
/// adjusted-close column falls back to the raw close.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<PriceRecord>> {
    let path = path.as_ref();
    info!("Loading price data from: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(config.has_headers)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut row_num = 0;

    for result in reader.deserialize() {
        row_num += 1;
        let row: CsvRow = match result {
            Ok(r) => r,
            Err(e) => {
                if config.skip_invalid {
                    debug!("Skipping row {}: {}", row_num, e);
                    skipped += 1;
                    continue;
                } else {
                    return Err(FolioError::CsvError(e));
                }
            }
        };

        let date = match parse_date(&row.date, config.date_format.as_deref()) {
            Ok(d) => d,
            Err(e) => {
                if config.skip_invalid {
                    debug!("Skipping row {} due to date parse error: {}", row_num, e);
                    skipped += 1;
                    continue;
                } else {
                    return Err(e);
                }
            }
        };

        let adj_close = row.adj_close.unwrap_or(row.close);
        records.push(PriceRecord::new(date, row.close, adj_close));
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows in {}", skipped, path.display());
    }

    records.sort_by_key(|r| r.date);
    let original_len = records.len();
    records.dedup_by_key(|r| r.date);
    if records.len() < original_len {
        warn!("Removed {} duplicate dates", original_len - records.len());
    }

    info!(
        "Loaded {} price records from {} to {}",
        records.len(),
        records
            .first()
            .map(|r| r.date.to_string())
            .unwrap_or_default(),
        records
            .last()
            .map(|r| r.date.to_string())
            .unwrap_or_default()
    );

    Ok(records)
}

/// A provider of historical prices for individual tickers.
///
/// An empty result is a valid answer: the source has no data for that ticker
/// in the requested window, which the engine treats as "exclude this
/// instrument" rather than an error.
pub trait PriceSource {
    fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>>;
}

/// Price source backed by a directory of per-ticker CSV files.
///
/// Each ticker's history lives in `<dir>/<TICKER>.csv`. A missing file is
/// treated as "no data" rather than an error, so a simulation can proceed
/// over the tickers that do have history.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    config: DataConfig,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config: DataConfig::default(),
        }
    }

    pub fn with_config(dir: impl Into<PathBuf>, config: DataConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    fn ticker_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }
}

impl PriceSource for CsvDirSource {
    fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>> {
        let path = self.ticker_path(ticker);
        if !path.is_file() {
            warn!("No price file for {}: {}", ticker, path.display());
            return Ok(Vec::new());
        }

        let mut records = load_csv(&path, &self.config)?;
        records.retain(|r| r.date >= start && r.date <= end);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn write_csv(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_csv_basic() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "VOO.csv",
            "Date,Close,Adj Close\n2021-01-04,100.0,99.0\n2021-01-05,110.0,108.9\n",
        );

        let records = load_csv(dir.path().join("VOO.csv"), &DataConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2021, 1, 4));
        assert_eq!(records[0].close, 100.0);
        assert_eq!(records[0].adj_close, 99.0);
    }

    #[test]
    fn test_load_csv_missing_adj_close_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "X.csv", "Date,Close\n2021-01-04,100.0\n");

        let records = load_csv(dir.path().join("X.csv"), &DataConfig::default()).unwrap();
        assert_eq!(records[0].adj_close, 100.0);
    }

    #[test]
    fn test_load_csv_skips_invalid_rows_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "X.csv",
            "Date,Close\n2021-01-05,110.0\nnot-a-date,1.0\n2021-01-04,100.0\n2021-01-04,999.0\n",
        );

        let records = load_csv(dir.path().join("X.csv"), &DataConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2021, 1, 4));
        assert_eq!(records[1].date, d(2021, 1, 5));
    }

    #[test]
    fn test_csv_dir_source_filters_range() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "VOO.csv",
            "Date,Close\n2020-12-31,90.0\n2021-01-04,100.0\n2021-02-01,105.0\n2021-06-30,110.0\n",
        );

        let source = CsvDirSource::new(dir.path());
        let records = source
            .fetch_price_history("VOO", d(2021, 1, 1), d(2021, 3, 31))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2021, 1, 4));
        assert_eq!(records[1].date, d(2021, 2, 1));
    }

    #[test]
    fn test_csv_dir_source_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDirSource::new(dir.path());
        let records = source
            .fetch_price_history("NOPE", d(2021, 1, 1), d(2021, 12, 31))
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2021-01-04", None).unwrap(), d(2021, 1, 4));
        assert_eq!(parse_date("04/01/2021", None).unwrap(), d(2021, 1, 4));
        assert_eq!(parse_date("04-Jan-2021", None).unwrap(), d(2021, 1, 4));
        assert!(parse_date("garbage", None).is_err());
    }
}
