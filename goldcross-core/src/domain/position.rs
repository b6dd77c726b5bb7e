//! Position — one open trade, from entry admission to exit settlement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Indicator values captured at entry, kept for post-run analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub ma_fast: f64,
    pub ma_slow: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// An open long position.
///
/// Created by the driver on entry admission, mutated each bar by the exit
/// resolver (high-water mark update), closed exactly once. Invariants for
/// an open position: `quantity > 0`, `stop_price < entry_price < target_price`,
/// and `highest_since_entry` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: f64,
    /// Cash removed from free capital at entry (notional + entry cost).
    pub capital_committed: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub highest_since_entry: f64,
    pub snapshot: EntrySnapshot,
    pub status: PositionStatus,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: String,
        entry_bar: usize,
        entry_date: NaiveDate,
        entry_price: f64,
        quantity: f64,
        capital_committed: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
        snapshot: EntrySnapshot,
    ) -> Self {
        debug_assert!(quantity > 0.0, "open position must have positive quantity");
        Self {
            symbol,
            entry_bar,
            entry_date,
            entry_price,
            quantity,
            capital_committed,
            stop_price: entry_price * (1.0 - stop_loss_pct),
            target_price: entry_price * (1.0 + take_profit_pct),
            highest_since_entry: entry_price,
            snapshot,
            status: PositionStatus::Open,
        }
    }

    /// Raise the high-water mark. NaN and lower values are ignored, so the
    /// mark is monotone non-decreasing for the life of the position.
    pub fn update_high(&mut self, bar_high: f64) {
        if !bar_high.is_nan() && bar_high > self.highest_since_entry {
            self.highest_since_entry = bar_high;
        }
    }

    /// Calendar days held as of `date`.
    pub fn days_held(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    /// Trailing-stop level for the given trail fraction.
    pub fn trailing_stop(&self, trailing_stop_pct: f64) -> f64 {
        self.highest_since_entry * (1.0 - trailing_stop_pct)
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}
