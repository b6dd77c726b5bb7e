//! Aligned multi-symbol market history.
//!
//! All symbols share one date axis. A symbol that did not trade on a date
//! another symbol did gets a void (all-NaN) bar — never a forward-filled
//! price, never a zero.

use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("no symbols provided")]
    NoSymbols,
    #[error("symbol {0} has no bars")]
    EmptySeries(String),
    #[error("symbol {symbol} has out-of-order or duplicate date {date}")]
    UnsortedSeries { symbol: String, date: NaiveDate },
    #[error("bar for {expected} carries symbol {found}")]
    SymbolMismatch { expected: String, found: String },
    #[error("benchmark symbol {0} not present in the data")]
    UnknownBenchmark(String),
}

/// Historical bars for a trading universe, aligned to a common timeline.
///
/// The benchmark symbol (if any) is carried alongside the universe but is
/// excluded from [`symbols`](Self::symbols) — it gates entries, it is never
/// traded.
#[derive(Debug, Clone)]
pub struct MarketData {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    bars: BTreeMap<String, Vec<Bar>>,
    benchmark: Option<String>,
}

impl MarketData {
    /// Build aligned data from per-symbol bar series.
    ///
    /// Each input series must be strictly ascending by date and carry its
    /// own symbol on every bar. The date axis is the union of all series'
    /// dates; gaps become void bars.
    pub fn from_series(
        series: BTreeMap<String, Vec<Bar>>,
        benchmark: Option<String>,
    ) -> Result<Self, DataError> {
        if series.is_empty() {
            return Err(DataError::NoSymbols);
        }
        if let Some(bench) = &benchmark {
            if !series.contains_key(bench) {
                return Err(DataError::UnknownBenchmark(bench.clone()));
            }
        }

        let mut all_dates = BTreeSet::new();
        for (symbol, bars) in &series {
            if bars.is_empty() {
                return Err(DataError::EmptySeries(symbol.clone()));
            }
            let mut prev: Option<NaiveDate> = None;
            for bar in bars {
                if bar.symbol != *symbol {
                    return Err(DataError::SymbolMismatch {
                        expected: symbol.clone(),
                        found: bar.symbol.clone(),
                    });
                }
                if prev.is_some_and(|p| bar.date <= p) {
                    return Err(DataError::UnsortedSeries {
                        symbol: symbol.clone(),
                        date: bar.date,
                    });
                }
                prev = Some(bar.date);
                all_dates.insert(bar.date);
            }
        }
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let mut aligned = BTreeMap::new();
        for (symbol, bars) in &series {
            let by_date: HashMap<NaiveDate, &Bar> = bars.iter().map(|b| (b.date, b)).collect();
            let row: Vec<Bar> = dates
                .iter()
                .map(|date| match by_date.get(date) {
                    Some(bar) => (*bar).clone(),
                    None => Bar::void(symbol, *date),
                })
                .collect();
            aligned.insert(symbol.clone(), row);
        }

        let symbols = aligned
            .keys()
            .filter(|s| Some(s.as_str()) != benchmark.as_deref())
            .cloned()
            .collect();

        Ok(Self {
            dates,
            symbols,
            bars: aligned,
            benchmark,
        })
    }

    /// Number of bars on the common date axis.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, idx: usize) -> Option<NaiveDate> {
        self.dates.get(idx).copied()
    }

    /// Tradeable symbols, alphabetical, benchmark excluded.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.bars.get(symbol).map(|b| b.as_slice())
    }

    pub fn benchmark_symbol(&self) -> Option<&str> {
        self.benchmark.as_deref()
    }

    pub fn benchmark_bars(&self) -> Option<&[Bar]> {
        self.benchmark.as_deref().and_then(|b| self.bars(b))
    }
}
