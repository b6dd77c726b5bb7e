//! Entry signal: edge-triggered golden cross with a blended strength score.

use crate::config::StrategyParams;
use crate::domain::Bar;
use crate::indicators::{self, IndicatorSeries};

/// Outcome of evaluating one symbol at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// True only on the bar where the fast MA first closes above the slow MA.
    pub triggered: bool,
    /// Blended quality score in [0, 1]; 0.0 when not triggered.
    pub strength: f64,
    pub ma_fast: f64,
    pub ma_slow: f64,
}

impl Signal {
    fn none() -> Self {
        Self {
            triggered: false,
            strength: 0.0,
            ma_fast: f64::NAN,
            ma_slow: f64::NAN,
        }
    }
}

/// Stateless evaluator for golden-cross entries.
///
/// Edge-triggered: the crossover condition must be false on the previous bar
/// and true on the current one, so a fast MA that stays above the slow MA
/// produces exactly one signal. All four MA values must be ready (non-NaN);
/// a void bar anywhere in either window suppresses the signal entirely.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    fast_key: String,
    slow_key: String,
    volume_key: String,
    volume_multiple: f64,
}

impl SignalEvaluator {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            fast_key: indicators::sma_key(params.fast_period),
            slow_key: indicators::sma_key(params.slow_period),
            volume_key: indicators::volume_ma_key(indicators::VOLUME_MA_PERIOD),
            volume_multiple: params.volume_multiple,
        }
    }

    /// Evaluate the entry signal for one symbol at `idx`.
    ///
    /// Pure with respect to its inputs: the same bars and series always
    /// produce the same result. Threshold and cooldown gating happen in the
    /// driver, not here.
    pub fn evaluate(&self, bars: &[Bar], series: &IndicatorSeries, idx: usize) -> Signal {
        if idx == 0 || idx >= bars.len() {
            return Signal::none();
        }
        let bar = &bars[idx];
        if bar.is_void() {
            return Signal::none();
        }

        let (Some(fast), Some(slow), Some(fast_prev), Some(slow_prev)) = (
            series.get_ready(&self.fast_key, idx),
            series.get_ready(&self.slow_key, idx),
            series.get_ready(&self.fast_key, idx - 1),
            series.get_ready(&self.slow_key, idx - 1),
        ) else {
            return Signal::none();
        };

        let golden_cross = fast_prev <= slow_prev && fast > slow;
        if !golden_cross {
            return Signal::none();
        }

        // Volume confirmation gate. Skipped when the average is not ready
        // yet or the bar carries no volume at all (live provisional bars
        // report volume as unknown, not as zero turnover).
        let volume_ratio = if bar.volume == 0 {
            None
        } else {
            series
                .get_ready(&self.volume_key, idx)
                .filter(|avg| *avg > 0.0)
                .map(|avg| bar.volume as f64 / avg)
        };
        if let Some(ratio) = volume_ratio {
            if ratio < self.volume_multiple {
                return Signal::none();
            }
        }

        let strength = blend_strength(
            bar.close,
            fast,
            slow,
            fast_prev,
            slow_prev,
            volume_ratio.unwrap_or(1.0),
        );

        Signal {
            triggered: true,
            strength,
            ma_fast: fast,
            ma_slow: slow,
        }
    }
}

/// Weighted blend of crossover quality terms, clamped to [0, 1].
///
/// Separation, slope, and price-position terms are expressed as percentages
/// of the slow MA so the score is scale-free across symbols. Weights:
/// separation 40%, crossover slope 30%, price above fast MA 20%, excess
/// volume 10%.
fn blend_strength(
    close: f64,
    fast: f64,
    slow: f64,
    fast_prev: f64,
    slow_prev: f64,
    volume_ratio: f64,
) -> f64 {
    let separation = (fast - slow) / slow * 100.0;
    let slope = ((fast - fast_prev) - (slow - slow_prev)) / slow * 100.0;
    let price_above_fast = (close - fast) / fast * 100.0;

    let raw = separation.abs() * 0.4
        + slope.abs() * 0.3
        + price_above_fast.abs() * 0.2
        + (volume_ratio - 1.0) * 0.1;

    raw.clamp(0.0, 1.0)
}
