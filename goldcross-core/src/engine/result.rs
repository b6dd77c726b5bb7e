//! Run output: closed trades, equity curve, breaker history.

use crate::domain::ClosedTrade;
use crate::risk::BreakerTrip;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One marked-to-market equity observation, end of bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Everything a backtest produces.
///
/// Trades are in close order; the equity curve has one point per bar. Both
/// are fully determined by the input data and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_capital: f64,
    /// Cash after end-of-run liquidation; equals the last equity point.
    pub final_equity: f64,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub breaker_trips: Vec<(NaiveDate, BreakerTrip)>,
    /// Bars skipped at the start while indicators warmed up.
    pub warmup_bars: usize,
}

impl RunResult {
    pub fn total_return_pct(&self) -> f64 {
        (self.final_equity - self.initial_capital) / self.initial_capital * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_return_from_equity() {
        let result = RunResult {
            initial_capital: 100_000.0,
            final_equity: 112_500.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            breaker_trips: Vec::new(),
            warmup_bars: 50,
        };
        assert!((result.total_return_pct() - 12.5).abs() < 1e-10);
    }
}
