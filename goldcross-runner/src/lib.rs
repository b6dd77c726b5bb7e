//! Goldcross Runner — backtest orchestration on top of `goldcross-core`.
//!
//! This crate provides:
//! - TOML run configuration with content-addressed run ids
//! - Bar loading from per-symbol CSV files or seeded synthetic data
//! - A single-backtest runner producing a self-describing result
//! - Performance metrics (returns, Sharpe, Sortino, drawdown, trade stats)
//! - Artifact export: result.json, trades.csv, equity.csv per run id

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{DataConfig, RunConfig, RunConfigError, RunId};
pub use data_loader::{load_market_data, load_symbol_csv, LoadError};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<DataConfig>();
        assert_sync::<DataConfig>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }
}
