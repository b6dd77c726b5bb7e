//! Market data: aligned multi-symbol history and synthetic generation.

pub mod market;
pub mod synthetic;

pub use market::{DataError, MarketData};
pub use synthetic::SyntheticUniverse;
