//! Live polling driver.
//!
//! One cycle re-derives the "current bar" for every symbol from the latest
//! quote appended to the daily history, then applies the same steps as the
//! backtest loop: exits, risk check, entry admission. Order submission is
//! additionally gated behind the trading-hours window and, when enabled, a
//! blocking manual approval. Slot and capital checks happen inside the
//! ledger at the moment of submission, after approval, so a slow approval
//! can never oversubscribe the portfolio.

use crate::config::{ConfigError, StrategyParams};
use crate::data::MarketData;
use crate::domain::{Bar, EntrySnapshot, ExitReason, Quote};
use crate::engine::precompute::{benchmark_series, symbol_series};
use crate::exits::ExitResolver;
use crate::indicators::IndicatorSeries;
use crate::ledger::{EntryRejection, PortfolioLedger};
use crate::regime::{Regime, RegimeFilter};
use crate::risk::RiskGovernor;
use crate::signal::SignalEvaluator;

use super::approval::{ApprovalError, TradeApprover, TradeRequest};
use super::feed::{fetch_with_retry, FeedError, PriceFeed};
use super::hours::TradingHours;
use super::sink::{TradeEvent, TradeSink};

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("no tradeable symbols in the history")]
    NoTradeableSymbols,
    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub poll_interval: Duration,
    pub hours: TradingHours,
    pub manual_approval: bool,
    pub fetch_attempts: u32,
    pub fetch_backoff: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            hours: TradingHours::nse(),
            manual_approval: true,
            fetch_attempts: 3,
            fetch_backoff: Duration::from_secs(2),
        }
    }
}

/// What happened during one polling cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub market_open: bool,
    pub equity: f64,
    pub entered: Vec<String>,
    pub exited: Vec<(String, ExitReason)>,
    /// Symbols with no usable price this cycle.
    pub data_gaps: Vec<String>,
}

pub struct LiveDriver<F, A, S> {
    params: StrategyParams,
    config: LiveConfig,
    history: MarketData,
    feed: F,
    approver: A,
    sink: S,
    evaluator: SignalEvaluator,
    regime_filter: RegimeFilter,
    resolver: ExitResolver,
    ledger: PortfolioLedger,
    governor: RiskGovernor,
    last_quotes: BTreeMap<String, Quote>,
    missed_cycles: BTreeMap<String, u32>,
    stop: Arc<AtomicBool>,
}

impl<F: PriceFeed, A: TradeApprover, S: TradeSink> LiveDriver<F, A, S> {
    pub fn new(
        params: StrategyParams,
        config: LiveConfig,
        history: MarketData,
        feed: F,
        approver: A,
        sink: S,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, LiveError> {
        params.validate()?;
        if history.symbols().is_empty() {
            return Err(LiveError::NoTradeableSymbols);
        }
        Ok(Self {
            evaluator: SignalEvaluator::new(&params),
            regime_filter: RegimeFilter::new(&params),
            resolver: ExitResolver::new(&params),
            ledger: PortfolioLedger::new(&params),
            governor: RiskGovernor::new(&params),
            params,
            config,
            history,
            feed,
            approver,
            sink,
            last_quotes: BTreeMap::new(),
            missed_cycles: BTreeMap::new(),
            stop,
        })
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    /// Poll until the stop signal is set. Open positions are left untouched
    /// on shutdown; liquidation is a human decision, not an engine one.
    pub fn run(&mut self) -> Result<(), LiveError> {
        info!(
            symbols = self.history.symbols().len(),
            interval_s = self.config.poll_interval.as_secs(),
            "live loop started"
        );
        while !self.stop.load(Ordering::SeqCst) {
            let now = Utc::now();
            if self.config.hours.contains(now.time()) {
                self.poll_once(now)?;
                std::thread::sleep(self.config.poll_interval);
            } else {
                let wait = self.config.hours.seconds_until_open(now.time());
                std::thread::sleep(self.config.poll_interval.min(Duration::from_secs(wait.into())));
            }
        }
        info!(
            open_positions = self.ledger.open_count(),
            "live loop stopped, positions left open"
        );
        Ok(())
    }

    /// One polling cycle at `now`. Public so tests and dry-run tooling can
    /// drive the loop with a scripted clock.
    pub fn poll_once(&mut self, now: DateTime<Utc>) -> Result<CycleReport, LiveError> {
        let mut report = CycleReport::default();
        if !self.config.hours.contains(now.time()) {
            report.equity = self.ledger.equity(&BTreeMap::new());
            return Ok(report);
        }
        report.market_open = true;
        let today = now.date_naive();

        let quotes = self.collect_quotes(now, &mut report);

        // 1. Exits for open positions that have a usable price.
        for symbol in self.ledger.open_symbols() {
            let Some(quote) = quotes.get(&symbol) else {
                continue;
            };
            let Some((bars, series)) = self.symbol_view(&symbol, quote, today) else {
                continue;
            };
            let t = bars.len() - 1;
            let decision = match self.ledger.position_mut(&symbol) {
                Some(position) => self.resolver.evaluate(position, &bars, &series, t),
                None => None,
            };
            let Some(decision) = decision else { continue };

            let position_quantity = self
                .ledger
                .position(&symbol)
                .map(|p| p.quantity)
                .unwrap_or(0.0);
            let request = TradeRequest::Exit {
                symbol: symbol.clone(),
                price: decision.price,
                quantity: position_quantity,
                reason: decision.reason,
            };
            if !self.approved(&request)? {
                info!(%symbol, reason = %decision.reason, "exit declined by approver");
                continue;
            }
            if let Some(trade) = self
                .ledger
                .close(&symbol, t, today, decision.price, decision.reason)
            {
                self.governor.record_trade(today, trade.pnl);
                report.exited.push((symbol.clone(), trade.reason));
                self.persist(TradeEvent::Exited {
                    trade,
                    timestamp: now,
                });
            }
        }

        // 2. Mark to market on the latest prices.
        let marks: BTreeMap<String, f64> = quotes
            .iter()
            .map(|(s, q)| (s.clone(), q.last_price))
            .collect();
        let equity = self.ledger.equity(&marks);
        self.governor.record_equity(today, equity);
        report.equity = equity;

        // 3. Entry admission. The stop signal halts entries immediately.
        if self.stop.load(Ordering::SeqCst) || !self.governor.entries_allowed(today) {
            return Ok(report);
        }
        let regime = self.current_regime(&quotes, today);
        if !self.regime_filter.is_tradeable(regime) {
            info!(%regime, "entries blocked by market regime");
            return Ok(report);
        }
        self.admit_entries(&quotes, today, now, &mut report)?;

        debug_assert!(self.ledger.verify_identity());
        Ok(report)
    }

    /// Fetch fresh quotes for every symbol, falling back to the previous
    /// quote for at most one missed cycle before declaring a data gap.
    fn collect_quotes(
        &mut self,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> BTreeMap<String, Quote> {
        let max_age = ChronoDuration::from_std(self.config.poll_interval * 2)
            .unwrap_or_else(|_| ChronoDuration::minutes(10));
        let mut symbols: Vec<String> = self.history.symbols().to_vec();
        if let Some(bench) = self.history.benchmark_symbol() {
            symbols.push(bench.to_string());
        }

        let mut quotes = BTreeMap::new();
        for symbol in symbols {
            match fetch_with_retry(
                &mut self.feed,
                &symbol,
                self.config.fetch_attempts,
                self.config.fetch_backoff,
            ) {
                Ok(quote) => {
                    self.missed_cycles.insert(symbol.clone(), 0);
                    self.last_quotes.insert(symbol.clone(), quote.clone());
                    quotes.insert(symbol, quote);
                }
                Err(err) => {
                    let missed = self.missed_cycles.entry(symbol.clone()).or_insert(0);
                    *missed += 1;
                    let fallback = self
                        .last_quotes
                        .get(&symbol)
                        .filter(|q| *missed <= 1 && !q.is_stale(now, max_age))
                        .cloned();
                    match fallback {
                        Some(quote) => {
                            warn!(%symbol, %err, "reusing previous quote for one cycle");
                            quotes.insert(symbol, quote);
                        }
                        None => {
                            error!(%symbol, %err, missed, "persistent data gap, symbol skipped");
                            report.data_gaps.push(symbol);
                        }
                    }
                }
            }
        }
        quotes
    }

    /// History plus today's provisional bar, with fresh indicator series.
    fn symbol_view(
        &self,
        symbol: &str,
        quote: &Quote,
        today: NaiveDate,
    ) -> Option<(Vec<Bar>, IndicatorSeries)> {
        let base = self.history.bars(symbol)?;
        let bars = extend_with_quote(base, quote, today);
        let series = symbol_series(&bars, &self.params);
        Some((bars, series))
    }

    /// Classify the benchmark on this cycle's quotes. The benchmark quote
    /// goes through the same gap policy as every tradeable symbol, so a
    /// benchmark feed outage degrades to history-only classification
    /// instead of pinning the regime to the last price ever seen.
    fn current_regime(&self, quotes: &BTreeMap<String, Quote>, today: NaiveDate) -> Regime {
        let Some(bench_symbol) = self.history.benchmark_symbol() else {
            return Regime::Unknown;
        };
        let Some(base) = self.history.benchmark_bars() else {
            return Regime::Unknown;
        };
        let bars = match quotes.get(bench_symbol) {
            Some(quote) => extend_with_quote(base, quote, today),
            None => base.to_vec(),
        };
        let series = benchmark_series(&bars, &self.params);
        self.regime_filter.classify(&bars, &series, bars.len() - 1)
    }

    fn admit_entries(
        &mut self,
        quotes: &BTreeMap<String, Quote>,
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<(), LiveError> {
        let mut candidates = Vec::new();
        for symbol in self.history.symbols() {
            if self.ledger.has_open(symbol) || self.ledger.in_cooldown(symbol, today) {
                continue;
            }
            let Some(quote) = quotes.get(symbol) else {
                continue;
            };
            let Some((bars, series)) = self.symbol_view(symbol, quote, today) else {
                continue;
            };
            let t = bars.len() - 1;
            let signal = self.evaluator.evaluate(&bars, &series, t);
            if signal.triggered && signal.strength >= self.params.min_signal_strength {
                candidates.push((symbol.clone(), signal, quote.last_price));
            }
        }
        candidates.sort_by(|a, b| {
            b.1.strength
                .partial_cmp(&a.1.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        for (symbol, signal, price) in candidates {
            // Cheap pre-check before bothering the approver.
            if self.ledger.can_enter(&symbol, today).is_err() {
                continue;
            }
            let budget = self.params.slot_budget();
            let quantity = ((budget - budget * self.params.transaction_cost_pct) / price).floor();
            let request = TradeRequest::Enter {
                symbol: symbol.clone(),
                price,
                quantity,
                strength: signal.strength,
            };
            if !self.approved(&request)? {
                info!(%symbol, "entry declined by approver");
                continue;
            }
            // The ledger re-validates slots and capital here, after the
            // blocking approval, so approvals can never double-spend.
            let snapshot = EntrySnapshot {
                ma_fast: signal.ma_fast,
                ma_slow: signal.ma_slow,
                signal_strength: signal.strength,
            };
            match self.ledger.enter(
                &symbol,
                self.history.len(),
                today,
                price,
                self.params.stop_loss_pct,
                self.params.take_profit_pct,
                snapshot,
            ) {
                Ok(position) => {
                    report.entered.push(symbol.clone());
                    let event = TradeEvent::Entered {
                        symbol: symbol.clone(),
                        price,
                        quantity: position.quantity,
                        capital_committed: position.capital_committed,
                        signal_strength: signal.strength,
                        timestamp: now,
                    };
                    self.persist(event);
                }
                Err(EntryRejection::NoSlot) => break,
                Err(reject) => {
                    info!(%symbol, %reject, "entry skipped at submission");
                }
            }
        }
        Ok(())
    }

    fn approved(&mut self, request: &TradeRequest) -> Result<bool, ApprovalError> {
        if !self.config.manual_approval {
            return Ok(true);
        }
        self.approver.approve(request)
    }

    /// Persistence failures are reported and swallowed; the loop goes on.
    fn persist(&mut self, event: TradeEvent) {
        if let Err(err) = self.sink.record(&event) {
            error!(%err, "trade sink write failed");
        }
    }
}

/// Append (or overwrite) today's provisional bar derived from a quote.
///
/// The bar carries zero volume, which the signal evaluator reads as
/// "volume unknown" rather than zero turnover.
fn extend_with_quote(base: &[Bar], quote: &Quote, today: NaiveDate) -> Vec<Bar> {
    let last = quote.last_price;
    let provisional = Bar {
        symbol: quote.symbol.clone(),
        date: today,
        open: last,
        high: quote.effective_high(),
        low: quote
            .day_low
            .filter(|l| !l.is_nan())
            .map_or(last, |l| l.min(last)),
        close: last,
        volume: 0,
    };

    let mut bars = base.to_vec();
    match bars.last() {
        Some(tail) if tail.date >= today => {
            if let Some(tail) = bars.last_mut() {
                *tail = provisional;
            }
        }
        _ => bars.push(provisional),
    }
    bars
}
