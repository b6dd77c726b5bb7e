//! Bar loading for the runner.
//!
//! Resolves a [`DataConfig`] to aligned [`MarketData`]:
//! - `csv` reads one `{SYMBOL}.csv` file per symbol (benchmark included)
//! - `synthetic` generates seeded random walks, no files needed
//!
//! CSV rows must be strictly ascending by date; alignment and void-bar
//! filling happen downstream in the core.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use goldcross_core::data::{DataError, MarketData, SyntheticUniverse};
use goldcross_core::domain::Bar;
use thiserror::Error;
use tracing::debug;

use crate::config::{DataConfig, RunConfig};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("{path} row {row}: bad date '{value}'")]
    BadDate {
        path: PathBuf,
        row: usize,
        value: String,
    },
    #[error("{path} row {row}: non-positive or inconsistent OHLC")]
    BadBar { path: PathBuf, row: usize },
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// One CSV row. Volume is optional; a missing volume becomes 0, which
/// the signal evaluator treats as "unknown" and skips the volume gate.
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

/// Load bars for every symbol named by the config, benchmark included.
pub fn load_market_data(config: &RunConfig) -> Result<MarketData, LoadError> {
    let mut names: Vec<&str> = config.universe.iter().map(String::as_str).collect();
    if let Some(bench) = &config.benchmark {
        names.push(bench.as_str());
    }
    names.sort_unstable();

    match &config.data {
        DataConfig::Csv { dir } => {
            let mut series = BTreeMap::new();
            for symbol in &names {
                let path = dir.join(format!("{symbol}.csv"));
                let bars = load_symbol_csv(&path, symbol)?;
                debug!(symbol, bars = bars.len(), "loaded bar series");
                series.insert(symbol.to_string(), bars);
            }
            Ok(MarketData::from_series(
                series,
                config.benchmark.clone(),
            )?)
        }
        DataConfig::Synthetic {
            seed,
            start_date,
            bar_count,
        } => {
            let universe = SyntheticUniverse::new(*seed, *start_date, *bar_count);
            Ok(universe.generate(&names, config.benchmark.as_deref())?)
        }
    }
}

/// Read a single symbol's CSV into bars, stamping the symbol on each row.
pub fn load_symbol_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = i + 2; // 1-based, after the header
        let rec = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let date = NaiveDate::parse_from_str(&rec.date, "%Y-%m-%d").map_err(|_| {
            LoadError::BadDate {
                path: path.to_path_buf(),
                row,
                value: rec.date.clone(),
            }
        })?;
        let bar = Bar {
            symbol: symbol.to_string(),
            date,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume,
        };
        if !bar.is_sane() {
            return Err(LoadError::BadBar {
                path: path.to_path_buf(),
                row,
            });
        }
        bars.push(bar);
    }
    Ok(bars)
}
