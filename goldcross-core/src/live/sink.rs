//! Trade persistence seam.

use crate::domain::ClosedTrade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Write(String),
}

/// Structured record of one portfolio mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeEvent {
    Entered {
        symbol: String,
        price: f64,
        quantity: f64,
        capital_committed: f64,
        signal_strength: f64,
        timestamp: DateTime<Utc>,
    },
    Exited {
        trade: ClosedTrade,
        timestamp: DateTime<Utc>,
    },
}

/// Receives trade events as they happen.
///
/// The driver logs and continues when a sink write fails — persistence is
/// never allowed to halt the trading loop.
pub trait TradeSink {
    fn record(&mut self, event: &TradeEvent) -> Result<(), SinkError>;
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<TradeEvent>,
    pub fail_writes: bool,
}

impl TradeSink for MemorySink {
    fn record(&mut self, event: &TradeEvent) -> Result<(), SinkError> {
        if self.fail_writes {
            return Err(SinkError::Write("memory sink in failure mode".into()));
        }
        self.events.push(event.clone());
        Ok(())
    }
}
