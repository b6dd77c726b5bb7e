//! Seeded synthetic market generation for demos and tests.

use super::market::{DataError, MarketData};
use crate::domain::Bar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Generator for a universe of correlated random walks.
///
/// Fully deterministic: each symbol's walk is seeded from the master seed
/// and the symbol name, so adding or reordering symbols never perturbs the
/// others. Weekends are skipped to mimic an exchange calendar.
#[derive(Debug, Clone)]
pub struct SyntheticUniverse {
    seed: u64,
    start: NaiveDate,
    bars_per_symbol: usize,
    /// Daily drift fraction applied to every walk.
    pub drift: f64,
    /// Daily volatility fraction.
    pub volatility: f64,
}

impl SyntheticUniverse {
    pub fn new(seed: u64, start: NaiveDate, bars_per_symbol: usize) -> Self {
        Self {
            seed,
            start,
            bars_per_symbol,
            drift: 0.0005,
            volatility: 0.015,
        }
    }

    /// Generate aligned data for `symbols`, optionally tagging one of them
    /// as the benchmark.
    pub fn generate(
        &self,
        symbols: &[&str],
        benchmark: Option<&str>,
    ) -> Result<MarketData, DataError> {
        let mut series = BTreeMap::new();
        for symbol in symbols {
            series.insert(symbol.to_string(), self.walk(symbol));
        }
        MarketData::from_series(series, benchmark.map(str::to_string))
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 8] = hash.as_bytes()[..8].try_into().unwrap_or([0; 8]);
        u64::from_le_bytes(bytes)
    }

    fn walk(&self, symbol: &str) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let mut price: f64 = rng.gen_range(80.0..2_000.0);
        let mut date = self.start;
        let mut bars = Vec::with_capacity(self.bars_per_symbol);

        while bars.len() < self.bars_per_symbol {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += Duration::days(1);
                continue;
            }

            let shock: f64 = rng.gen_range(-1.0..1.0);
            let ret = self.drift + self.volatility * shock;
            let open = price;
            let close = (price * (1.0 + ret)).max(1.0);
            let spread = price * self.volatility * rng.gen_range(0.2..1.0);
            let high = open.max(close) + spread;
            let low = (open.min(close) - spread).max(0.5);
            let volume = rng.gen_range(50_000..5_000_000);

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
            price = close;
            date += Duration::days(1);
        }
        bars
    }
}
