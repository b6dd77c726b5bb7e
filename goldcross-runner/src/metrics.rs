//! Performance metrics — pure functions over trades and the equity curve.
//!
//! Every metric is a pure function: equity curve and/or trade list in,
//! scalar out. No dependency on the engine or the data pipeline, so the
//! same functions serve backtest reports and live session summaries.

use std::collections::BTreeMap;

use goldcross_core::domain::ClosedTrade;
use goldcross_core::engine::EquityPoint;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total return as a percentage of initial equity.
    pub total_return_pct: f64,
    /// Compound annual growth rate, percent, assuming 252 bars per year.
    pub annualized_return_pct: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Annualized return over the deepest drawdown; 0.0 when the curve
    /// never drew down or never grew.
    pub calmar: f64,
    /// Deepest peak-to-trough equity decline, as a negative percentage.
    pub max_drawdown_pct: f64,

    pub trade_count: usize,
    /// Fraction of trades with pnl > 0. Zero when there are no trades.
    pub win_rate: f64,
    /// Gross wins / gross losses. `None` when there are no losing trades,
    /// where any finite number would overstate certainty.
    pub profit_factor: Option<f64>,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_days_held: f64,
    /// Trade count per exit reason label, alphabetical.
    pub exits_by_reason: BTreeMap<String, usize>,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and a trade list.
    pub fn compute(equity_curve: &[EquityPoint], trades: &[ClosedTrade]) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        Self {
            total_return_pct: total_return_pct(&equity),
            annualized_return_pct: annualized_return_pct(&equity),
            sharpe: sharpe_ratio(&equity),
            sortino: sortino_ratio(&equity),
            calmar: calmar_ratio(&equity),
            max_drawdown_pct: max_drawdown_pct(&equity),
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            avg_days_held: avg_days_held(trades),
            exits_by_reason: exits_by_reason(trades),
        }
    }
}

/// Total return as a percentage: (final - initial) / initial * 100.
pub fn total_return_pct(equity: &[f64]) -> f64 {
    if equity.len() < 2 || equity[0] <= 0.0 {
        return 0.0;
    }
    (equity[equity.len() - 1] - equity[0]) / equity[0] * 100.0
}

/// CAGR in percent, with 252 bars counted as a year.
pub fn annualized_return_pct(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let initial = equity[0];
    let final_eq = equity[equity.len() - 1];
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = equity.len() as f64 / TRADING_DAYS_PER_YEAR;
    ((final_eq / initial).powf(1.0 / years) - 1.0) * 100.0
}

/// Annualized Sharpe ratio of daily equity returns (zero risk-free rate).
///
/// Returns 0.0 for fewer than two returns or zero variance.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = daily_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio: like Sharpe but penalizing downside only.
///
/// Returns 0.0 when there are no negative returns.
pub fn sortino_ratio(equity: &[f64]) -> f64 {
    let returns = daily_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(&returns);
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calmar ratio: annualized return / |max drawdown|.
///
/// Returns 0.0 when the drawdown is zero or the annualized return is
/// non-positive, where the ratio stops meaning anything.
pub fn calmar_ratio(equity: &[f64]) -> f64 {
    let annual = annualized_return_pct(equity);
    let dd = max_drawdown_pct(equity);
    if dd >= 0.0 || annual <= 0.0 {
        return 0.0;
    }
    annual / dd.abs()
}

/// Deepest peak-to-trough decline as a negative percentage, 0.0 for a
/// curve that never falls below its running peak.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak * 100.0;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Fraction of trades with positive pnl.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit divided by gross loss; `None` with zero losing trades.
pub fn profit_factor(trades: &[ClosedTrade]) -> Option<f64> {
    let gross_win: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();
    if gross_loss == 0.0 {
        None
    } else {
        Some(gross_win / gross_loss)
    }
}

pub fn avg_win(trades: &[ClosedTrade]) -> f64 {
    let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
    if wins.is_empty() {
        0.0
    } else {
        mean(&wins)
    }
}

pub fn avg_loss(trades: &[ClosedTrade]) -> f64 {
    let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();
    if losses.is_empty() {
        0.0
    } else {
        mean(&losses)
    }
}

pub fn avg_days_held(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.days_held as f64).sum::<f64>() / trades.len() as f64
}

/// Trade count keyed by exit reason label.
pub fn exits_by_reason(trades: &[ClosedTrade]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for trade in trades {
        *counts.entry(trade.reason.label().to_string()).or_insert(0) += 1;
    }
    counts
}

fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use goldcross_core::domain::ExitReason;

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                date: start + chrono::Duration::days(i as i64),
                equity,
            })
            .collect()
    }

    fn trade(pnl: f64, days_held: i64, reason: ExitReason) -> ClosedTrade {
        let entry = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        ClosedTrade {
            symbol: "TCS".into(),
            entry_bar: 1,
            entry_date: entry,
            entry_price: 100.0,
            exit_bar: 1 + days_held as usize,
            exit_date: entry + chrono::Duration::days(days_held),
            exit_price: 100.0 + pnl / 50.0,
            quantity: 50.0,
            capital_committed: 5_005.0,
            net_proceeds: 5_005.0 + pnl,
            pnl,
            pnl_pct: pnl / 5_005.0 * 100.0,
            reason,
            signal_strength: 0.5,
            days_held,
        }
    }

    #[test]
    fn total_return_from_endpoints() {
        assert!((total_return_pct(&[100_000.0, 90_000.0, 112_000.0]) - 12.0).abs() < 1e-10);
        assert_eq!(total_return_pct(&[100_000.0]), 0.0);
    }

    #[test]
    fn annualized_return_one_year_matches_total() {
        let equity: Vec<f64> = (0..252)
            .map(|i| 100_000.0 * (1.0 + 0.20 * i as f64 / 251.0))
            .collect();
        let cagr = annualized_return_pct(&equity);
        assert!((cagr - 20.0).abs() < 0.5, "cagr = {cagr}");
    }

    #[test]
    fn max_drawdown_finds_the_worst_trough() {
        // Peak 120 then trough 90: -25%.
        let dd = max_drawdown_pct(&[100.0, 120.0, 105.0, 90.0, 110.0]);
        assert!((dd - (-25.0)).abs() < 1e-10);
        assert_eq!(max_drawdown_pct(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn calmar_is_return_over_drawdown() {
        // Dip to 95 off the 100 start (-5%), finish at 115.
        let equity = [100_000.0, 95_000.0, 104_000.0, 110_000.0, 115_000.0];
        let expected = annualized_return_pct(&equity) / 5.0;
        assert!((calmar_ratio(&equity) - expected).abs() < 1e-10);
        assert!(calmar_ratio(&equity) > 0.0);
    }

    #[test]
    fn calmar_is_zero_without_drawdown_or_gain() {
        // Monotone rise: no drawdown to divide by.
        assert_eq!(calmar_ratio(&[100.0, 101.0, 102.0, 103.0]), 0.0);
        // Net decline: a negative ratio would read as nonsense.
        assert_eq!(calmar_ratio(&[100.0, 90.0, 95.0]), 0.0);
    }

    #[test]
    fn sharpe_is_zero_for_flat_equity() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0, 100.0]), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let equity: Vec<f64> = (0..100).map(|i| 100_000.0 + 100.0 * i as f64).collect();
        assert!(sharpe_ratio(&equity) > 0.0);
    }

    #[test]
    fn sortino_ignores_upside_volatility() {
        // Alternating big up / small up days: no downside at all.
        let equity = [100.0, 103.0, 103.5, 106.5, 107.0];
        assert_eq!(sortino_ratio(&equity), 0.0);

        let with_down = [100.0, 103.0, 102.0, 105.0, 104.0, 108.0];
        assert!(sortino_ratio(&with_down) > 0.0);
    }

    #[test]
    fn profit_factor_is_none_without_losses() {
        let trades = vec![
            trade(500.0, 5, ExitReason::TakeProfit),
            trade(300.0, 8, ExitReason::TrailingStop),
        ];
        assert_eq!(profit_factor(&trades), None);

        let mixed = vec![
            trade(600.0, 5, ExitReason::TakeProfit),
            trade(-200.0, 3, ExitReason::StopLoss),
        ];
        assert!((profit_factor(&mixed).unwrap() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn win_and_loss_averages() {
        let trades = vec![
            trade(400.0, 10, ExitReason::TakeProfit),
            trade(200.0, 6, ExitReason::TrailingStop),
            trade(-150.0, 4, ExitReason::StopLoss),
        ];
        assert!((win_rate(&trades) - 2.0 / 3.0).abs() < 1e-10);
        assert!((avg_win(&trades) - 300.0).abs() < 1e-10);
        assert!((avg_loss(&trades) - (-150.0)).abs() < 1e-10);
        assert!((avg_days_held(&trades) - 20.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn exit_breakdown_uses_reason_labels() {
        let trades = vec![
            trade(400.0, 10, ExitReason::TakeProfit),
            trade(-150.0, 4, ExitReason::StopLoss),
            trade(-90.0, 2, ExitReason::StopLoss),
        ];
        let counts = exits_by_reason(&trades);
        assert_eq!(counts["Stop Loss"], 2);
        assert_eq!(counts["Take Profit"], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn compute_handles_empty_run() {
        let metrics = PerformanceMetrics::compute(&curve(&[100_000.0; 10]), &[]);
        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, None);
        assert_eq!(metrics.total_return_pct, 0.0);
        assert!(metrics.exits_by_reason.is_empty());
    }
}
