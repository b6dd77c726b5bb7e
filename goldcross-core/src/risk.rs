//! Portfolio circuit breakers.

use crate::config::StrategyParams;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What tripped the breaker, kept for logs and the run report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BreakerTrip {
    Drawdown { drawdown_pct: f64 },
    ConsecutiveLosses { count: usize },
}

/// Two independent circuit breakers sharing one suspension window.
///
/// The drawdown breaker watches equity against its running peak; the
/// loss-streak breaker counts consecutive losing exits. Either trip
/// suspends entry admission until a resume date; a trip while already
/// suspended never extends the window. Suspension blocks entries only —
/// open positions keep being managed by the exit resolver.
#[derive(Debug, Clone)]
pub struct RiskGovernor {
    max_drawdown_pct: f64,
    max_consecutive_losses: usize,
    cooldown: Duration,
    peak_equity: f64,
    consecutive_losses: usize,
    suspended_until: Option<NaiveDate>,
    trips: Vec<(NaiveDate, BreakerTrip)>,
}

impl RiskGovernor {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            max_drawdown_pct: params.max_drawdown_pct,
            max_consecutive_losses: params.max_consecutive_losses,
            cooldown: Duration::days(params.cooldown_days),
            peak_equity: params.initial_capital,
            consecutive_losses: 0,
            suspended_until: None,
            trips: Vec::new(),
        }
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn consecutive_losses(&self) -> usize {
        self.consecutive_losses
    }

    /// History of breaker trips over the run.
    pub fn trips(&self) -> &[(NaiveDate, BreakerTrip)] {
        &self.trips
    }

    /// Drawdown from peak as a fraction, given current equity.
    pub fn drawdown(&self, equity: f64) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        ((self.peak_equity - equity) / self.peak_equity).max(0.0)
    }

    /// Feed the marked portfolio equity for `date`.
    ///
    /// Drawdown is measured against the peak before this observation; the
    /// peak then ratchets up if `equity` is a new high.
    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        let drawdown = self.drawdown(equity);
        if drawdown >= self.max_drawdown_pct {
            self.trip(
                date,
                BreakerTrip::Drawdown {
                    drawdown_pct: drawdown * 100.0,
                },
            );
        }
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }

    /// Feed a closed trade's realized P&L.
    pub fn record_trade(&mut self, date: NaiveDate, pnl: f64) {
        if pnl < 0.0 {
            self.consecutive_losses += 1;
            if self.consecutive_losses >= self.max_consecutive_losses {
                self.trip(
                    date,
                    BreakerTrip::ConsecutiveLosses {
                        count: self.consecutive_losses,
                    },
                );
            }
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Whether entry admission may run on `date`. Clears an expired
    /// suspension and resets the loss streak on resume.
    pub fn entries_allowed(&mut self, date: NaiveDate) -> bool {
        match self.suspended_until {
            Some(resume) if date < resume => false,
            Some(resume) => {
                info!(%resume, %date, "circuit breaker suspension lifted");
                self.suspended_until = None;
                self.consecutive_losses = 0;
                true
            }
            None => true,
        }
    }

    pub fn is_suspended(&self, date: NaiveDate) -> bool {
        self.suspended_until.is_some_and(|resume| date < resume)
    }

    fn trip(&mut self, date: NaiveDate, trip: BreakerTrip) {
        self.trips.push((date, trip));
        // A resume date already in the future is never extended.
        if self.is_suspended(date) {
            return;
        }
        let resume = date + self.cooldown;
        warn!(?trip, %date, %resume, "circuit breaker tripped, entries suspended");
        self.suspended_until = Some(resume);
    }
}
