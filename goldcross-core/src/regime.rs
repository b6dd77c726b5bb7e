//! Market regime classification from a benchmark index series.

use crate::config::StrategyParams;
use crate::domain::Bar;
use crate::indicators::{self, IndicatorSeries, MOMENTUM_LOOKBACK};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Momentum band (percent over the lookback) separating trending from
/// sideways markets.
const TREND_MOMENTUM_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Bull,
    Sideways,
    Bear,
    /// Benchmark data missing or still in warmup.
    Unknown,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Bull => "bull",
            Regime::Sideways => "sideways",
            Regime::Bear => "bear",
            Regime::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Gate on new entries derived from a benchmark index.
///
/// Classification per bar: close above the benchmark MA with momentum beyond
/// +2% is bull; below the MA with momentum beyond -2% is bear; anything else
/// in between is sideways. The filter only ever blocks entries — existing
/// positions are left to the exit resolver.
#[derive(Debug, Clone)]
pub struct RegimeFilter {
    ma_key: String,
    momentum_key: String,
    allow_sideways: bool,
}

impl RegimeFilter {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            ma_key: indicators::sma_key(params.regime_ma_period),
            momentum_key: indicators::momentum_key(MOMENTUM_LOOKBACK),
            allow_sideways: params.allow_sideways_entries,
        }
    }

    pub fn classify(&self, bars: &[Bar], series: &IndicatorSeries, idx: usize) -> Regime {
        let Some(bar) = bars.get(idx) else {
            return Regime::Unknown;
        };
        if bar.is_void() {
            return Regime::Unknown;
        }
        let (Some(ma), Some(momentum)) = (
            series.get_ready(&self.ma_key, idx),
            series.get_ready(&self.momentum_key, idx),
        ) else {
            return Regime::Unknown;
        };

        if bar.close > ma {
            if momentum > TREND_MOMENTUM_PCT {
                Regime::Bull
            } else {
                Regime::Sideways
            }
        } else if momentum < -TREND_MOMENTUM_PCT {
            Regime::Bear
        } else {
            Regime::Sideways
        }
    }

    /// Whether new entries are admitted under `regime`.
    ///
    /// Unknown is tradeable: a run with no benchmark configured degrades to
    /// an unfiltered strategy rather than one that never trades.
    pub fn is_tradeable(&self, regime: Regime) -> bool {
        match regime {
            Regime::Bull | Regime::Unknown => true,
            Regime::Sideways => self.allow_sideways,
            Regime::Bear => false,
        }
    }
}
