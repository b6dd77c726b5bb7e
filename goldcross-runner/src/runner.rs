//! Backtest runner — wires together config, data loading, engine, metrics.
//!
//! Two entry points:
//! - [`run_single_backtest`]: resolves data from the config, then runs.
//!   Used by the CLI.
//! - [`run_backtest_from_data`]: takes pre-loaded data. Used by tests and
//!   callers that sweep parameters over one dataset.

use goldcross_core::data::MarketData;
use goldcross_core::domain::ClosedTrade;
use goldcross_core::engine::{run_backtest, EngineError, EquityPoint};
use goldcross_core::risk::BreakerTrip;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{RunConfig, RunConfigError, RunId};
use crate::data_loader::{load_market_data, LoadError};
use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Complete result of a single backtest run, self-describing enough to
/// reproduce: the config that produced it rides along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,

    pub initial_capital: f64,
    pub final_equity: f64,
    pub metrics: PerformanceMetrics,

    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub breaker_trips: Vec<(NaiveDate, BreakerTrip)>,
    pub warmup_bars: usize,
    pub bar_count: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a config, loading bars as it names them.
pub fn run_single_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = load_market_data(config)?;
    run_backtest_from_data(config, &data)
}

/// Run a backtest over pre-loaded data. No I/O.
pub fn run_backtest_from_data(
    config: &RunConfig,
    data: &MarketData,
) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id();
    info!(
        run_id = %run_id,
        symbols = data.symbols().len(),
        bars = data.len(),
        "starting backtest"
    );

    let result = run_backtest(data, &config.strategy)?;
    let metrics = PerformanceMetrics::compute(&result.equity_curve, &result.trades);

    info!(
        run_id = %run_id,
        trades = result.trades.len(),
        total_return_pct = metrics.total_return_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        initial_capital: result.initial_capital,
        final_equity: result.final_equity,
        metrics,
        bar_count: result.equity_curve.len(),
        trades: result.trades,
        equity_curve: result.equity_curve,
        breaker_trips: result.breaker_trips,
        warmup_bars: result.warmup_bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use goldcross_core::config::StrategyParams;

    fn synthetic_config() -> RunConfig {
        RunConfig {
            universe: vec!["INFY".into(), "RELIANCE".into(), "TCS".into()],
            benchmark: None,
            data: DataConfig::Synthetic {
                seed: 19,
                start_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                bar_count: 400,
            },
            strategy: StrategyParams {
                min_signal_strength: 0.0,
                volume_multiple: 0.0,
                ..StrategyParams::default()
            },
        }
    }

    #[test]
    fn result_carries_config_and_consistent_totals() {
        let config = synthetic_config();
        let result = run_single_backtest(&config).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.run_id, config.run_id());
        assert_eq!(result.config, config);
        assert_eq!(result.bar_count, 400);
        assert_eq!(result.equity_curve.len(), 400);

        let booked: f64 = result.trades.iter().map(|t| t.pnl).sum();
        assert!((result.final_equity - (result.initial_capital + booked)).abs() < 1e-6);
        assert!(
            (result.metrics.total_return_pct
                - (result.final_equity - result.initial_capital) / result.initial_capital * 100.0)
                .abs()
                < 1e-9
        );
        assert_eq!(result.metrics.trade_count, result.trades.len());
    }

    #[test]
    fn invalid_config_is_rejected_before_any_io() {
        let mut config = synthetic_config();
        config.universe.clear();
        assert!(matches!(
            run_single_backtest(&config),
            Err(RunError::Config(RunConfigError::EmptyUniverse))
        ));
    }

    #[test]
    fn identical_configs_produce_identical_results() {
        let config = synthetic_config();
        let a = run_single_backtest(&config).unwrap();
        let b = run_single_backtest(&config).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
