//! Domain types: bars, quotes, positions, closed trades.

pub mod bar;
pub mod position;
pub mod quote;
pub mod trade;

pub use bar::Bar;
pub use position::{EntrySnapshot, Position, PositionStatus};
pub use quote::Quote;
pub use trade::{ClosedTrade, ExitReason};
