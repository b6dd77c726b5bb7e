//! Manual-approval seam for live order submission.

use crate::domain::ExitReason;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval channel closed: {0}")]
    ChannelClosed(String),
}

/// What the approver is asked to confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeRequest {
    Enter {
        symbol: String,
        price: f64,
        quantity: f64,
        strength: f64,
    },
    Exit {
        symbol: String,
        price: f64,
        quantity: f64,
        reason: ExitReason,
    },
}

impl TradeRequest {
    pub fn symbol(&self) -> &str {
        match self {
            TradeRequest::Enter { symbol, .. } | TradeRequest::Exit { symbol, .. } => symbol,
        }
    }
}

/// Blocking decision point before any order is recorded.
///
/// Implementations may prompt a human (console, chat) or answer
/// programmatically. A `false` means the order is skipped this cycle; the
/// signal may recur on a later cycle.
pub trait TradeApprover {
    fn approve(&mut self, request: &TradeRequest) -> Result<bool, ApprovalError>;
}

/// Approves everything. Used when manual approval is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprover;

impl TradeApprover for AutoApprover {
    fn approve(&mut self, _request: &TradeRequest) -> Result<bool, ApprovalError> {
        Ok(true)
    }
}

/// Replays a fixed sequence of decisions; answers `false` once exhausted.
/// Records every request it saw, for assertions.
#[derive(Debug, Default)]
pub struct ScriptedApprover {
    decisions: VecDeque<bool>,
    pub seen: Vec<TradeRequest>,
}

impl ScriptedApprover {
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            seen: Vec::new(),
        }
    }
}

impl TradeApprover for ScriptedApprover {
    fn approve(&mut self, request: &TradeRequest) -> Result<bool, ApprovalError> {
        self.seen.push(request.clone());
        Ok(self.decisions.pop_front().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> TradeRequest {
        TradeRequest::Enter {
            symbol: symbol.to_string(),
            price: 100.0,
            quantity: 10.0,
            strength: 0.5,
        }
    }

    #[test]
    fn auto_approver_always_says_yes() {
        let mut approver = AutoApprover;
        assert!(approver.approve(&entry("TCS")).unwrap());
    }

    #[test]
    fn scripted_approver_replays_then_denies() {
        let mut approver = ScriptedApprover::new([true, false]);
        assert!(approver.approve(&entry("A")).unwrap());
        assert!(!approver.approve(&entry("B")).unwrap());
        assert!(!approver.approve(&entry("C")).unwrap()); // exhausted
        assert_eq!(approver.seen.len(), 3);
        assert_eq!(approver.seen[0].symbol(), "A");
    }
}
