//! Portfolio ledger: cash, open positions, cooldowns, closed trades.
//!
//! The ledger is the only place capital moves. Entry removes committed cash
//! from free capital; exit returns net proceeds. The accounting identity
//! `free + Σ committed == initial + Σ realized_pnl` holds after every
//! mutation and is checked by [`PortfolioLedger::verify_identity`].

use crate::config::StrategyParams;
use crate::domain::{ClosedTrade, EntrySnapshot, ExitReason, Position, PositionStatus};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why an entry was refused. Not a failure of the run, just a gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntryRejection {
    #[error("all position slots are occupied")]
    NoSlot,
    #[error("symbol already has an open position")]
    AlreadyHeld,
    #[error("symbol is in post-loss cooldown")]
    InCooldown,
    #[error("free capital cannot buy a single share")]
    InsufficientCapital,
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_capital: f64,
    free_capital: f64,
    realized_pnl: f64,
    slot_budget: f64,
    max_positions: usize,
    transaction_cost_pct: f64,
    cooldown: Duration,
    // BTreeMap so iteration order is alphabetical and runs are reproducible.
    positions: BTreeMap<String, Position>,
    cooldown_until: BTreeMap<String, NaiveDate>,
    closed: Vec<ClosedTrade>,
}

impl PortfolioLedger {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            initial_capital: params.initial_capital,
            free_capital: params.initial_capital,
            realized_pnl: 0.0,
            slot_budget: params.slot_budget(),
            max_positions: params.max_positions,
            transaction_cost_pct: params.transaction_cost_pct,
            cooldown: Duration::days(params.cooldown_days),
            positions: BTreeMap::new(),
            cooldown_until: BTreeMap::new(),
            closed: Vec::new(),
        }
    }

    pub fn free_capital(&self) -> f64 {
        self.free_capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_open(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    /// Open positions in alphabetical symbol order.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Symbols with open positions, alphabetical. Collected so callers can
    /// mutate the ledger while walking the list.
    pub fn open_symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn in_cooldown(&self, symbol: &str, date: NaiveDate) -> bool {
        self.cooldown_until
            .get(symbol)
            .is_some_and(|until| date < *until)
    }

    /// Gate check without committing capital. `enter` re-runs the same
    /// checks, so callers may skip this and just try.
    pub fn can_enter(&self, symbol: &str, date: NaiveDate) -> Result<(), EntryRejection> {
        if self.positions.len() >= self.max_positions {
            return Err(EntryRejection::NoSlot);
        }
        if self.positions.contains_key(symbol) {
            return Err(EntryRejection::AlreadyHeld);
        }
        if self.in_cooldown(symbol, date) {
            return Err(EntryRejection::InCooldown);
        }
        Ok(())
    }

    /// Open a position at `entry_price`, committing capital from the free
    /// pool.
    ///
    /// Sizing is fixed equal-weight: the budget is always
    /// `initial / max_positions`. If free capital cannot cover a full slot
    /// the entry is skipped outright rather than downsized, so partial fills
    /// never occur. The entry cost is charged on the budget and the
    /// remainder buys whole shares; only the shares actually bought plus the
    /// cost leave the free pool.
    #[allow(clippy::too_many_arguments)]
    pub fn enter(
        &mut self,
        symbol: &str,
        entry_bar: usize,
        entry_date: NaiveDate,
        entry_price: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
        snapshot: EntrySnapshot,
    ) -> Result<&Position, EntryRejection> {
        self.can_enter(symbol, entry_date)?;

        if self.free_capital < self.slot_budget || entry_price <= 0.0 {
            return Err(EntryRejection::InsufficientCapital);
        }
        let budget = self.slot_budget;
        let entry_cost = budget * self.transaction_cost_pct;
        let quantity = ((budget - entry_cost) / entry_price).floor();
        if quantity < 1.0 {
            return Err(EntryRejection::InsufficientCapital);
        }
        let committed = quantity * entry_price + entry_cost;

        self.free_capital -= committed;
        let position = Position::open(
            symbol.to_string(),
            entry_bar,
            entry_date,
            entry_price,
            quantity,
            committed,
            stop_loss_pct,
            take_profit_pct,
            snapshot,
        );
        self.positions.insert(symbol.to_string(), position);
        Ok(&self.positions[symbol])
    }

    /// Close an open position at `exit_price`, returning the trade record.
    ///
    /// Net proceeds (after the exit-leg cost) go back to free capital. A
    /// losing trade starts the symbol's cooldown clock from the exit date.
    /// Returns `None` if the symbol has no open position.
    pub fn close(
        &mut self,
        symbol: &str,
        exit_bar: usize,
        exit_date: NaiveDate,
        exit_price: f64,
        reason: ExitReason,
    ) -> Option<ClosedTrade> {
        let mut position = self.positions.remove(symbol)?;
        position.status = PositionStatus::Closed;

        let gross = exit_price * position.quantity;
        let exit_cost = gross * self.transaction_cost_pct;
        let net_proceeds = gross - exit_cost;
        let pnl = net_proceeds - position.capital_committed;
        let pnl_pct = pnl / position.capital_committed * 100.0;

        self.free_capital += net_proceeds;
        self.realized_pnl += pnl;

        if pnl < 0.0 {
            self.cooldown_until
                .insert(symbol.to_string(), exit_date + self.cooldown);
        }

        let trade = ClosedTrade {
            symbol: symbol.to_string(),
            entry_bar: position.entry_bar,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_bar,
            exit_date,
            exit_price,
            quantity: position.quantity,
            capital_committed: position.capital_committed,
            net_proceeds,
            pnl,
            pnl_pct,
            reason,
            signal_strength: position.snapshot.signal_strength,
            days_held: position.days_held(exit_date),
        };
        self.closed.push(trade.clone());
        Some(trade)
    }

    /// Free capital plus open positions marked at the prices in `marks`.
    /// Symbols missing from `marks` (void bar today) are marked at entry.
    pub fn equity(&self, marks: &BTreeMap<String, f64>) -> f64 {
        let held: f64 = self
            .positions
            .values()
            .map(|p| match marks.get(&p.symbol) {
                Some(price) if !price.is_nan() => p.market_value(*price),
                _ => p.market_value(p.entry_price),
            })
            .sum();
        self.free_capital + held
    }

    /// Accounting identity check, used in debug assertions by the drivers.
    pub fn verify_identity(&self) -> bool {
        let committed: f64 = self.positions.values().map(|p| p.capital_committed).sum();
        let lhs = self.free_capital + committed;
        let rhs = self.initial_capital + self.realized_pnl;
        (lhs - rhs).abs() < 1e-6 * self.initial_capital.max(1.0)
    }
}
