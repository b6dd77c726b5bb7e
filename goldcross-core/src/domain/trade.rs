//! ClosedTrade — a completed round-trip trade record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
///
/// The exit resolver returns exactly one of the first five reasons per
/// position per bar, chosen by fixed priority (stop loss first, max hold
/// last). `EndOfRun` is stamped only by the backtest driver when it
/// liquidates remaining positions at the final bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    DeathCross,
    MaxHold,
    EndOfRun,
}

impl ExitReason {
    /// Human-readable label used in trade logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::TrailingStop => "Trailing Stop",
            ExitReason::DeathCross => "Death Cross",
            ExitReason::MaxHold => "Max Hold Period",
            ExitReason::EndOfRun => "End of Run",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A complete entry → exit round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,

    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    pub quantity: f64,
    pub capital_committed: f64,
    /// Exit proceeds net of transaction cost.
    pub net_proceeds: f64,
    /// Realized profit or loss net of both legs' transaction costs.
    pub pnl: f64,
    pub pnl_pct: f64,

    pub reason: ExitReason,
    pub signal_strength: f64,
    pub days_held: i64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
