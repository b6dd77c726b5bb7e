//! Live trading: polling loop over real-time quotes.
//!
//! Same per-cycle semantics as the backtest driver, with three extra gates:
//! a trading-hours window, an external manual-approval step per order, and
//! an external stop signal that halts new entries immediately without
//! touching open positions.

pub mod approval;
pub mod driver;
pub mod feed;
pub mod hours;
pub mod sink;

pub use approval::{ApprovalError, AutoApprover, ScriptedApprover, TradeApprover, TradeRequest};
pub use driver::{CycleReport, LiveConfig, LiveDriver, LiveError};
pub use feed::{FeedError, PriceFeed, StaticFeed};
pub use hours::TradingHours;
pub use sink::{MemorySink, SinkError, TradeEvent, TradeSink};
