//! Strategy parameters and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fast MA period ({fast}) must be shorter than slow MA period ({slow})")]
    MaOrdering { fast: usize, slow: usize },
    #[error("{name} must be in ({min}, {max}), got {value}")]
    FractionOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("stop loss ({stop}) must be tighter than take profit ({take})")]
    StopNotBelowTake { stop: f64, take: f64 },
    #[error("min hold days ({min_hold}) must not exceed max hold days ({max_hold})")]
    HoldOrdering { min_hold: i64, max_hold: i64 },
    #[error("max positions must be at least 1")]
    NoPositionSlots,
    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),
    #[error("minimum signal strength must be in [0, 1], got {0}")]
    StrengthOutOfRange(f64),
}

/// Full parameter set for the crossover strategy.
///
/// All `*_pct` fields are fractions (0.10 = 10%), not percentages. Defaults
/// mirror the tuned daily-bar configuration; callers that build params by
/// hand must run [`validate`](Self::validate) before handing them to a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Fast SMA period (bars).
    pub fast_period: usize,
    /// Slow SMA period (bars); also the warmup length of the run.
    pub slow_period: usize,

    /// Maximum simultaneously open positions.
    pub max_positions: usize,
    /// Starting cash.
    pub initial_capital: f64,
    /// Proportional transaction cost applied on both legs.
    pub transaction_cost_pct: f64,

    /// Hard stop below entry.
    pub stop_loss_pct: f64,
    /// Profit target above entry.
    pub take_profit_pct: f64,
    /// Trail below the high-water mark.
    pub trailing_stop_pct: f64,
    /// Calendar days before trailing stop and death cross may fire.
    pub min_hold_days: i64,
    /// Calendar days after which a position is force-closed.
    pub max_hold_days: i64,

    /// Entry admission floor for blended signal strength, in [0, 1].
    pub min_signal_strength: f64,
    /// Volume must exceed its 20-bar average times this multiple.
    pub volume_multiple: f64,
    /// Whether entries are admitted in a sideways regime.
    pub allow_sideways_entries: bool,

    /// Benchmark SMA period for regime classification.
    pub regime_ma_period: usize,

    /// Drawdown fraction from peak equity that trips the circuit breaker.
    pub max_drawdown_pct: f64,
    /// Consecutive losing exits that trip the circuit breaker.
    pub max_consecutive_losses: usize,
    /// Calendar days that entry admission stays suspended after a breaker
    /// trips; also the per-symbol cooldown after a losing exit.
    pub cooldown_days: i64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            max_positions: 3,
            initial_capital: 100_000.0,
            transaction_cost_pct: 0.001,
            stop_loss_pct: 0.10,
            take_profit_pct: 0.30,
            trailing_stop_pct: 0.03,
            min_hold_days: 1,
            max_hold_days: 25,
            min_signal_strength: 0.37,
            volume_multiple: 1.2,
            allow_sideways_entries: false,
            regime_ma_period: 50,
            max_drawdown_pct: 0.15,
            max_consecutive_losses: 5,
            cooldown_days: 10,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_period >= self.slow_period {
            return Err(ConfigError::MaOrdering {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        if self.max_positions == 0 {
            return Err(ConfigError::NoPositionSlots);
        }
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }

        for (name, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("trailing_stop_pct", self.trailing_stop_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::FractionOutOfRange {
                    name,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if !(0.0..1.0).contains(&self.transaction_cost_pct) {
            return Err(ConfigError::FractionOutOfRange {
                name: "transaction_cost_pct",
                value: self.transaction_cost_pct,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.stop_loss_pct >= self.take_profit_pct {
            return Err(ConfigError::StopNotBelowTake {
                stop: self.stop_loss_pct,
                take: self.take_profit_pct,
            });
        }
        if self.min_hold_days > self.max_hold_days {
            return Err(ConfigError::HoldOrdering {
                min_hold: self.min_hold_days,
                max_hold: self.max_hold_days,
            });
        }
        if !(0.0..=1.0).contains(&self.min_signal_strength) {
            return Err(ConfigError::StrengthOutOfRange(self.min_signal_strength));
        }
        Ok(())
    }

    /// Per-position budget under fixed equal-weight sizing.
    pub fn slot_budget(&self) -> f64 {
        self.initial_capital / self.max_positions as f64
    }

    /// Bars to skip before the strategy has enough history to trade.
    pub fn warmup_bars(&self) -> usize {
        self.slow_period.max(self.regime_ma_period)
    }
}
