//! Quote — a point-in-time price snapshot from a live market-data feed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Last-traded price snapshot for one symbol.
///
/// Day high/low are optional: live feeds routinely omit them early in the
/// session or on degraded responses. The live driver must tolerate partial
/// quotes without crashing; only `last_price` and `timestamp` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_price: f64,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Whether the quote is older than `max_age` relative to `now`.
    ///
    /// A stale quote may be used for at most one missed polling interval;
    /// beyond that the driver reports a data gap instead of guessing.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now.signed_duration_since(self.timestamp) > max_age
    }

    /// Best available high for intraday extrema tracking: the reported
    /// day high when present, otherwise the last price.
    pub fn effective_high(&self) -> f64 {
        match self.day_high {
            Some(h) if !h.is_nan() => h.max(self.last_price),
            _ => self.last_price,
        }
    }
}
