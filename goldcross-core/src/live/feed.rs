//! Market-data feed seam.

use crate::domain::Quote;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no quote available for {0}")]
    NoQuote(String),
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Source of point-in-time quotes. One blocking call per symbol.
pub trait PriceFeed {
    fn fetch(&mut self, symbol: &str) -> Result<Quote, FeedError>;
}

/// Fetch with bounded retries and doubling backoff.
///
/// Transient feed failures are retried `attempts` times before the error is
/// surfaced; the caller then treats the symbol as having no signal this
/// cycle rather than aborting the loop.
pub fn fetch_with_retry<F: PriceFeed + ?Sized>(
    feed: &mut F,
    symbol: &str,
    attempts: u32,
    base_delay: Duration,
) -> Result<Quote, FeedError> {
    let mut delay = base_delay;
    let mut last_err = FeedError::NoQuote(symbol.to_string());
    for attempt in 0..attempts.max(1) {
        match feed.fetch(symbol) {
            Ok(quote) => return Ok(quote),
            Err(err) => {
                warn!(%symbol, attempt, %err, "quote fetch failed");
                last_err = err;
                if attempt + 1 < attempts {
                    std::thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    Err(last_err)
}

/// Fixed in-memory feed for tests and dry runs. Symbols absent from the map
/// report [`FeedError::NoQuote`].
#[derive(Debug, Default, Clone)]
pub struct StaticFeed {
    quotes: BTreeMap<String, Quote>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn remove(&mut self, symbol: &str) {
        self.quotes.remove(symbol);
    }
}

impl PriceFeed for StaticFeed {
    fn fetch(&mut self, symbol: &str) -> Result<Quote, FeedError> {
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| FeedError::NoQuote(symbol.to_string()))
    }
}
