//! Backtest engine: indicator precompute, bar loop, run result.

pub mod driver;
pub mod precompute;
pub mod result;

pub use driver::{run_backtest, EngineError};
pub use precompute::PrecomputedIndicators;
pub use result::{EquityPoint, RunResult};
