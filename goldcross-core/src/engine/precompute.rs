//! One-shot indicator precompute over the whole universe.

use crate::config::StrategyParams;
use crate::data::MarketData;
use crate::domain::Bar;
use crate::indicators::{
    self, momentum, sma, IndicatorSeries, MOMENTUM_LOOKBACK, VOLUME_MA_PERIOD,
};
use std::collections::BTreeMap;

/// All indicator series the drivers need, computed before the bar loop.
#[derive(Debug, Clone)]
pub struct PrecomputedIndicators {
    per_symbol: BTreeMap<String, IndicatorSeries>,
    benchmark: IndicatorSeries,
}

impl PrecomputedIndicators {
    /// Compute fast/slow SMAs and the volume average for every tradeable
    /// symbol, plus the regime SMA and momentum for the benchmark.
    pub fn compute(data: &MarketData, params: &StrategyParams) -> Self {
        let mut per_symbol = BTreeMap::new();
        for symbol in data.symbols() {
            if let Some(bars) = data.bars(symbol) {
                per_symbol.insert(symbol.clone(), symbol_series(bars, params));
            }
        }

        let benchmark = match data.benchmark_bars() {
            Some(bars) => benchmark_series(bars, params),
            None => IndicatorSeries::new(),
        };

        Self {
            per_symbol,
            benchmark,
        }
    }

    pub fn symbol(&self, symbol: &str) -> Option<&IndicatorSeries> {
        self.per_symbol.get(symbol)
    }

    /// Benchmark series; empty when no benchmark is configured, which the
    /// regime filter reads as an unknown (tradeable) regime.
    pub fn benchmark(&self) -> &IndicatorSeries {
        &self.benchmark
    }
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Regime inputs for the benchmark index.
pub(crate) fn benchmark_series(bars: &[Bar], params: &StrategyParams) -> IndicatorSeries {
    let closes = closes(bars);
    let mut series = IndicatorSeries::new();
    series.insert(
        indicators::sma_key(params.regime_ma_period),
        sma(&closes, params.regime_ma_period),
    );
    series.insert(
        indicators::momentum_key(MOMENTUM_LOOKBACK),
        momentum(&closes, MOMENTUM_LOOKBACK),
    );
    series
}

/// Signal and exit inputs for one tradeable symbol.
pub(crate) fn symbol_series(bars: &[Bar], params: &StrategyParams) -> IndicatorSeries {
    let closes = closes(bars);
    // Void bars have no real volume; NaN keeps them out of the average.
    let volumes: Vec<f64> = bars
        .iter()
        .map(|b| if b.is_void() { f64::NAN } else { b.volume as f64 })
        .collect();

    let mut series = IndicatorSeries::new();
    series.insert(
        indicators::sma_key(params.fast_period),
        sma(&closes, params.fast_period),
    );
    series.insert(
        indicators::sma_key(params.slow_period),
        sma(&closes, params.slow_period),
    );
    series.insert(
        indicators::volume_ma_key(VOLUME_MA_PERIOD),
        sma(&volumes, VOLUME_MA_PERIOD),
    );
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ramp(symbol: &str, len: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..len)
            .map(|i| Bar {
                symbol: symbol.to_string(),
                date: start + Duration::days(i as i64),
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.0 + i as f64,
                volume: 10_000,
            })
            .collect()
    }

    fn data(len: usize) -> MarketData {
        let mut series = BTreeMap::new();
        series.insert("TCS".to_string(), ramp("TCS", len));
        series.insert("NIFTY50".to_string(), ramp("NIFTY50", len));
        MarketData::from_series(series, Some("NIFTY50".to_string())).unwrap()
    }

    #[test]
    fn computes_all_symbol_series() {
        let params = StrategyParams::default();
        let pre = PrecomputedIndicators::compute(&data(80), &params);
        let tcs = pre.symbol("TCS").unwrap();
        assert!(tcs.contains("sma_20"));
        assert!(tcs.contains("sma_50"));
        assert!(tcs.contains("volume_ma_20"));
        // Warmup respected: slow SMA first valid at index 49.
        assert!(tcs.get_ready("sma_50", 48).is_none());
        assert!(tcs.get_ready("sma_50", 49).is_some());
    }

    #[test]
    fn benchmark_gets_regime_series_only() {
        let params = StrategyParams::default();
        let pre = PrecomputedIndicators::compute(&data(80), &params);
        assert!(pre.symbol("NIFTY50").is_none());
        assert!(pre.benchmark().contains("sma_50"));
        assert!(pre.benchmark().contains("momentum_20"));
    }

    #[test]
    fn no_benchmark_means_empty_benchmark_series() {
        let mut series = BTreeMap::new();
        series.insert("TCS".to_string(), ramp("TCS", 60));
        let data = MarketData::from_series(series, None).unwrap();
        let pre = PrecomputedIndicators::compute(&data, &StrategyParams::default());
        assert!(!pre.benchmark().contains("sma_50"));
    }
}
