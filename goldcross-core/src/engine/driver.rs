//! Deterministic single-threaded backtest loop.
//!
//! Per-bar order is fixed and is itself a correctness requirement:
//! exits for open positions first, then mark-to-market and the risk check,
//! then entry admission. An entry on bar t never sees bar t's own exit
//! evaluation or any t+1 data.

use crate::config::{ConfigError, StrategyParams};
use crate::data::MarketData;
use crate::domain::{EntrySnapshot, ExitReason};
use crate::exits::ExitResolver;
use crate::ledger::{EntryRejection, PortfolioLedger};
use crate::regime::{Regime, RegimeFilter};
use crate::risk::RiskGovernor;
use crate::signal::SignalEvaluator;

use super::precompute::PrecomputedIndicators;
use super::result::{EquityPoint, RunResult};

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("no tradeable symbols in the data")]
    NoTradeableSymbols,
}

/// Run the strategy over `data` and return the full result.
pub fn run_backtest(data: &MarketData, params: &StrategyParams) -> Result<RunResult, EngineError> {
    params.validate()?;
    if data.symbols().is_empty() {
        return Err(EngineError::NoTradeableSymbols);
    }

    let pre = PrecomputedIndicators::compute(data, params);
    let evaluator = SignalEvaluator::new(params);
    let regime_filter = RegimeFilter::new(params);
    let resolver = ExitResolver::new(params);
    let mut ledger = PortfolioLedger::new(params);
    let mut governor = RiskGovernor::new(params);

    let warmup = params.warmup_bars();
    let mut equity_curve = Vec::with_capacity(data.len());

    info!(
        symbols = data.symbols().len(),
        bars = data.len(),
        warmup,
        "backtest started"
    );

    for t in 0..data.len() {
        let date = match data.date(t) {
            Some(d) => d,
            None => break,
        };

        // 1. Exits for every open position, alphabetical.
        for symbol in ledger.open_symbols() {
            let (Some(bars), Some(series)) = (data.bars(&symbol), pre.symbol(&symbol)) else {
                continue;
            };
            let decision = match ledger.position_mut(&symbol) {
                Some(position) => resolver.evaluate(position, bars, series, t),
                None => None,
            };
            if let Some(decision) = decision {
                if let Some(trade) =
                    ledger.close(&symbol, t, date, decision.price, decision.reason)
                {
                    info!(
                        symbol = %trade.symbol,
                        reason = %trade.reason,
                        pnl = trade.pnl,
                        "position closed"
                    );
                    governor.record_trade(date, trade.pnl);
                }
            }
        }

        // 2. Mark to market and feed the drawdown breaker.
        let marks = close_marks(data, &ledger, t);
        let equity = ledger.equity(&marks);
        governor.record_equity(date, equity);

        // 3. Entry admission, unless warming up or suspended.
        if t >= warmup && governor.entries_allowed(date) {
            let regime = benchmark_regime(data, &pre, &regime_filter, t);
            if regime_filter.is_tradeable(regime) {
                admit_entries(data, &pre, &evaluator, &mut ledger, params, t, date);
            } else {
                debug!(%regime, %date, "entries blocked by market regime");
            }
        }

        debug_assert!(ledger.verify_identity(), "ledger identity broken at {date}");

        let marks = close_marks(data, &ledger, t);
        equity_curve.push(EquityPoint {
            date,
            equity: ledger.equity(&marks),
        });
    }

    liquidate_remaining(data, &mut ledger);

    let final_equity = ledger.free_capital();
    if let Some(last) = equity_curve.last_mut() {
        last.equity = final_equity;
    }

    let trades = ledger.closed_trades().to_vec();
    info!(
        trades = trades.len(),
        final_equity,
        trips = governor.trips().len(),
        "backtest finished"
    );

    Ok(RunResult {
        initial_capital: params.initial_capital,
        final_equity,
        trades,
        equity_curve,
        breaker_trips: governor.trips().to_vec(),
        warmup_bars: warmup,
    })
}

/// Closing prices for currently open symbols; void bars are left out so the
/// ledger falls back to entry-price marks.
fn close_marks(data: &MarketData, ledger: &PortfolioLedger, t: usize) -> BTreeMap<String, f64> {
    let mut marks = BTreeMap::new();
    for position in ledger.open_positions() {
        if let Some(bars) = data.bars(&position.symbol) {
            if let Some(bar) = bars.get(t) {
                if !bar.is_void() {
                    marks.insert(position.symbol.clone(), bar.close);
                }
            }
        }
    }
    marks
}

fn benchmark_regime(
    data: &MarketData,
    pre: &PrecomputedIndicators,
    filter: &RegimeFilter,
    t: usize,
) -> Regime {
    match data.benchmark_bars() {
        Some(bars) => filter.classify(bars, pre.benchmark(), t),
        None => Regime::Unknown,
    }
}

/// Collect qualifying signals, order them strength-descending with an
/// alphabetical tie-break, and fill the open slots.
fn admit_entries(
    data: &MarketData,
    pre: &PrecomputedIndicators,
    evaluator: &SignalEvaluator,
    ledger: &mut PortfolioLedger,
    params: &StrategyParams,
    t: usize,
    date: chrono::NaiveDate,
) {
    let mut candidates = Vec::new();
    for symbol in data.symbols() {
        if ledger.has_open(symbol) || ledger.in_cooldown(symbol, date) {
            continue;
        }
        let (Some(bars), Some(series)) = (data.bars(symbol), pre.symbol(symbol)) else {
            continue;
        };
        let signal = evaluator.evaluate(bars, series, t);
        if signal.triggered && signal.strength >= params.min_signal_strength {
            let close = bars[t].close;
            candidates.push((symbol.clone(), signal, close));
        }
    }

    candidates.sort_by(|a, b| {
        b.1.strength
            .partial_cmp(&a.1.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    for (symbol, signal, price) in candidates {
        let snapshot = EntrySnapshot {
            ma_fast: signal.ma_fast,
            ma_slow: signal.ma_slow,
            signal_strength: signal.strength,
        };
        match ledger.enter(
            &symbol,
            t,
            date,
            price,
            params.stop_loss_pct,
            params.take_profit_pct,
            snapshot,
        ) {
            Ok(position) => {
                info!(
                    %symbol,
                    price,
                    quantity = position.quantity,
                    strength = signal.strength,
                    "position opened"
                );
            }
            Err(EntryRejection::NoSlot) => break,
            Err(reject) => {
                debug!(%symbol, %reject, "entry skipped");
            }
        }
    }
}

/// Close whatever is still open at the last available price of each symbol.
fn liquidate_remaining(data: &MarketData, ledger: &mut PortfolioLedger) {
    let last_idx = data.len().saturating_sub(1);
    let Some(last_date) = data.date(last_idx) else {
        return;
    };
    for symbol in ledger.open_symbols() {
        let Some(bars) = data.bars(&symbol) else {
            continue;
        };
        // Walk back past trailing void bars to the last traded price.
        let last_close = bars
            .iter()
            .rev()
            .find(|b| !b.is_void())
            .map(|b| b.close)
            .or_else(|| ledger.position(&symbol).map(|p| p.entry_price));
        if let Some(price) = last_close {
            if let Some(trade) = ledger.close(&symbol, last_idx, last_date, price, ExitReason::EndOfRun)
            {
                info!(symbol = %trade.symbol, pnl = trade.pnl, "liquidated at end of run");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Bars tracing out the given closes, one calendar day apart.
    fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: symbol.to_string(),
                date: start() + Duration::days(i as i64),
                open: close,
                high: close * 1.005,
                low: close * 0.995,
                close,
                volume: 100_000,
            })
            .collect()
    }

    /// Flat then sharply rising closes: crossover soon after warmup.
    fn crossover_closes(len: usize, flat: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                if i < flat {
                    100.0
                } else {
                    100.0 + (i - flat) as f64 * 2.0
                }
            })
            .collect()
    }

    fn universe(symbols: &[&str], closes: &[f64]) -> MarketData {
        let mut series = BTreeMap::new();
        for symbol in symbols {
            series.insert(symbol.to_string(), bars_from_closes(symbol, closes));
        }
        MarketData::from_series(series, None).unwrap()
    }

    fn relaxed_params() -> StrategyParams {
        StrategyParams {
            min_signal_strength: 0.0,
            volume_multiple: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn uptrend_produces_trades_and_preserves_identity() {
        let closes = crossover_closes(160, 60);
        let data = universe(&["INFY", "TCS"], &closes);
        let result = run_backtest(&data, &relaxed_params()).unwrap();

        assert!(!result.trades.is_empty(), "uptrend should trade");
        assert_eq!(result.equity_curve.len(), 160);
        // Every exit reason is one of the defined kinds; entries only after
        // warmup.
        for trade in &result.trades {
            assert!(trade.entry_bar >= result.warmup_bars);
            assert!(trade.exit_bar >= trade.entry_bar);
        }
        let last = result.equity_curve.last().unwrap();
        assert_eq!(last.equity, result.final_equity);
    }

    #[test]
    fn flat_market_never_trades() {
        let closes = vec![100.0; 120];
        let data = universe(&["INFY"], &closes);
        let result = run_backtest(&data, &relaxed_params()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_equity, 100_000.0);
    }

    #[test]
    fn runs_are_byte_identical() {
        let closes = crossover_closes(200, 60);
        let data = universe(&["HDFC", "INFY", "SBIN", "TCS", "WIPRO"], &closes);
        let params = relaxed_params();
        let a = run_backtest(&data, &params).unwrap();
        let b = run_backtest(&data, &params).unwrap();
        let ja = serde_json::to_string(&a.trades).unwrap();
        let jb = serde_json::to_string(&b.trades).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn slots_capped_and_tie_break_is_alphabetical() {
        // Five identical symbols cross at once; only three slots exist and
        // identical strengths must resolve alphabetically.
        let closes = crossover_closes(80, 60);
        let data = universe(&["AAA", "BBB", "CCC", "DDD", "EEE"], &closes);
        let result = run_backtest(&data, &relaxed_params()).unwrap();

        let mut entered: Vec<&str> = result
            .trades
            .iter()
            .map(|t| t.symbol.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        entered.sort();
        assert_eq!(entered, ["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn selection_is_strength_descending_before_alphabetical() {
        // Same price path, but BBB and CCC cross on a volume surge that
        // lifts their signal strength above AAA's. With two slots the
        // stronger pair must win even though AAA sorts first.
        let closes = crossover_closes(80, 60);
        let mut series = BTreeMap::new();
        for (symbol, surge) in [("AAA", 100_000), ("BBB", 200_000), ("CCC", 400_000)] {
            let mut bars = bars_from_closes(symbol, &closes);
            bars[61].volume = surge;
            series.insert(symbol.to_string(), bars);
        }
        let data = MarketData::from_series(series, None).unwrap();
        let params = StrategyParams {
            max_positions: 2,
            ..relaxed_params()
        };
        let result = run_backtest(&data, &params).unwrap();

        let mut entered: Vec<&str> = result
            .trades
            .iter()
            .map(|t| t.symbol.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        entered.sort();
        assert_eq!(entered, ["BBB", "CCC"]);
    }

    #[test]
    fn open_positions_liquidated_at_end_of_run() {
        // Crossover late enough that max-hold has no time to fire.
        let closes = crossover_closes(75, 60);
        let data = universe(&["INFY"], &closes);
        let result = run_backtest(&data, &relaxed_params()).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].reason, ExitReason::EndOfRun);
    }

    #[test]
    fn invalid_params_fail_before_running() {
        let data = universe(&["INFY"], &[100.0; 60]);
        let params = StrategyParams {
            stop_loss_pct: 0.5,
            take_profit_pct: 0.3,
            ..Default::default()
        };
        assert!(matches!(
            run_backtest(&data, &params),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bear_benchmark_blocks_entries() {
        let closes = crossover_closes(160, 60);
        let mut series = BTreeMap::new();
        series.insert("INFY".to_string(), bars_from_closes("INFY", &closes));
        // Benchmark in steady decline: always below its MA with momentum
        // beyond -2%.
        let bench: Vec<f64> = (0..160).map(|i| 20_000.0 - i as f64 * 60.0).collect();
        series.insert("NIFTY50".to_string(), bars_from_closes("NIFTY50", &bench));
        let data = MarketData::from_series(series, Some("NIFTY50".to_string())).unwrap();

        let result = run_backtest(&data, &relaxed_params()).unwrap();
        assert!(result.trades.is_empty());
    }
}
