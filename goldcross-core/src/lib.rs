//! Goldcross Core — crossover strategy engine.
//!
//! This crate contains the whole trading engine:
//! - Domain types (bars, quotes, positions, closed trades)
//! - Indicator precompute (SMA, volume average, momentum)
//! - Edge-triggered golden-cross signal with blended strength scoring
//! - Benchmark regime filter (bull / sideways / bear)
//! - Portfolio ledger with fixed equal-weight sizing and cooldowns
//! - Prioritized exit resolution (stop, target, trail, death cross, max hold)
//! - Circuit breakers (drawdown, consecutive losses)
//! - Deterministic backtest driver and a polling live driver

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod exits;
pub mod indicators;
pub mod ledger;
pub mod live;
pub mod regime;
pub mod risk;
pub mod signal;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine state types are Send + Sync, so callers
    /// may run independent backtests on worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Quote>();
        require_sync::<domain::Quote>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();

        require_send::<config::StrategyParams>();
        require_sync::<config::StrategyParams>();
        require_send::<data::MarketData>();
        require_sync::<data::MarketData>();
        require_send::<indicators::IndicatorSeries>();
        require_sync::<indicators::IndicatorSeries>();

        require_send::<signal::SignalEvaluator>();
        require_sync::<signal::SignalEvaluator>();
        require_send::<regime::RegimeFilter>();
        require_sync::<regime::RegimeFilter>();
        require_send::<exits::ExitResolver>();
        require_sync::<exits::ExitResolver>();
        require_send::<ledger::PortfolioLedger>();
        require_sync::<ledger::PortfolioLedger>();
        require_send::<risk::RiskGovernor>();
        require_sync::<risk::RiskGovernor>();

        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
    }

    /// Architecture contract: the signal evaluator never sees portfolio
    /// state. Its signature takes bars and indicator series only, so entry
    /// logic cannot couple to capital or open positions.
    #[test]
    fn signal_evaluator_has_no_portfolio_parameter() {
        fn _check(
            evaluator: &signal::SignalEvaluator,
            bars: &[domain::Bar],
            series: &indicators::IndicatorSeries,
        ) -> signal::Signal {
            evaluator.evaluate(bars, series, 0)
        }
    }
}
