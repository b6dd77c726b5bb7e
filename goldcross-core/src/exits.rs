//! Exit resolution: five prioritized rules, first match wins.

use crate::config::StrategyParams;
use crate::domain::{Bar, ExitReason, Position};
use crate::indicators::{self, IndicatorSeries};

/// The exit chosen for one position on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    /// Fill price used for settlement.
    pub price: f64,
}

/// Per-position exit evaluation at close of bar.
///
/// Rules are checked in fixed priority and exactly one fires per bar:
/// stop loss, take profit, trailing stop, death cross, max hold. The stop
/// is tested against the bar's low, so a dip that touches the stop and
/// recovers by the close still exits at the stop price; a bar that crosses
/// both the stop and the target therefore always settles as a stop.
/// Trailing stop and death cross are gated behind the minimum hold period;
/// max hold is an unconditional fallback.
#[derive(Debug, Clone)]
pub struct ExitResolver {
    fast_key: String,
    slow_key: String,
    trailing_stop_pct: f64,
    min_hold_days: i64,
    max_hold_days: i64,
}

impl ExitResolver {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            fast_key: indicators::sma_key(params.fast_period),
            slow_key: indicators::sma_key(params.slow_period),
            trailing_stop_pct: params.trailing_stop_pct,
            min_hold_days: params.min_hold_days,
            max_hold_days: params.max_hold_days,
        }
    }

    /// Evaluate exits for `position` against the bar at `idx`.
    ///
    /// The position's high-water mark is raised with the bar's high before
    /// any rule that depends on it runs, so the trailing level reflects the
    /// current bar. Void bars produce no decision; held time still accrues.
    pub fn evaluate(
        &self,
        position: &mut Position,
        bars: &[Bar],
        series: &IndicatorSeries,
        idx: usize,
    ) -> Option<ExitDecision> {
        let bar = bars.get(idx)?;
        if bar.is_void() {
            return None;
        }
        position.update_high(bar.high);

        let price = bar.close;
        let days_held = position.days_held(bar.date);

        if bar.low <= position.stop_price {
            return Some(ExitDecision {
                reason: ExitReason::StopLoss,
                price: position.stop_price,
            });
        }
        if price >= position.target_price {
            return Some(ExitDecision {
                reason: ExitReason::TakeProfit,
                price: position.target_price,
            });
        }
        if days_held >= self.min_hold_days {
            let trail = position.trailing_stop(self.trailing_stop_pct);
            if price <= trail {
                return Some(ExitDecision {
                    reason: ExitReason::TrailingStop,
                    price: trail,
                });
            }
            if self.death_cross(series, idx) {
                return Some(ExitDecision {
                    reason: ExitReason::DeathCross,
                    price,
                });
            }
        }
        if days_held >= self.max_hold_days {
            return Some(ExitDecision {
                reason: ExitReason::MaxHold,
                price,
            });
        }
        None
    }

    /// Edge-triggered bearish crossover on the position's own symbol.
    fn death_cross(&self, series: &IndicatorSeries, idx: usize) -> bool {
        if idx == 0 {
            return false;
        }
        let (Some(fast), Some(slow), Some(fast_prev), Some(slow_prev)) = (
            series.get_ready(&self.fast_key, idx),
            series.get_ready(&self.slow_key, idx),
            series.get_ready(&self.fast_key, idx - 1),
            series.get_ready(&self.slow_key, idx - 1),
        ) else {
            return false;
        };
        fast_prev >= slow_prev && fast < slow
    }
}
