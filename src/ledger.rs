//! Session balance ledger
//!
//! A single account debited when a wager is placed and credited when a round
//! pays out. The ledger is owned by the session and handed to every game
//! action as `&mut BalanceLedger`, so each debit/credit is applied exactly once.

use crate::errors::LedgerError;
use crate::games::types::GameType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Opening balance of a fresh session
pub const DEFAULT_OPENING_BALANCE: f64 = 1000.0;

/// Journal entries retained by default
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Debit,
    Credit,
}

/// One applied balance mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub game: GameType,
    pub amount: f64,
    pub balance_after: f64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BalanceLedger {
    balance: f64,
    journal: VecDeque<LedgerEntry>,
    journal_capacity: usize,
}

impl BalanceLedger {
    pub fn new(opening_balance: f64) -> Self {
        Self::with_journal_capacity(opening_balance, DEFAULT_JOURNAL_CAPACITY)
    }

    pub fn with_journal_capacity(opening_balance: f64, journal_capacity: usize) -> Self {
        Self {
            balance: opening_balance.max(0.0),
            journal: VecDeque::with_capacity(journal_capacity.min(1024)),
            journal_capacity,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn can_cover(&self, amount: f64) -> bool {
        amount <= self.balance
    }

    /// Withdraw a wager. Over-draws are rejected and leave the balance untouched.
    pub fn debit(&mut self, game: GameType, amount: f64) -> Result<f64, LedgerError> {
        Self::check_amount(amount)?;
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.record(EntryKind::Debit, game, amount);
        Ok(self.balance)
    }

    /// Deposit winnings or a refund. Zero credits are accepted and journaled.
    pub fn credit(&mut self, game: GameType, amount: f64) -> Result<f64, LedgerError> {
        Self::check_amount(amount)?;
        self.balance += amount;
        self.record(EntryKind::Credit, game, amount);
        Ok(self.balance)
    }

    /// Most recent entries first
    pub fn journal(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.journal.iter().rev()
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn check_amount(amount: f64) -> Result<(), LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn record(&mut self, kind: EntryKind, game: GameType, amount: f64) {
        debug!(game = %game, ?kind, amount, balance = self.balance, "ledger updated");
        if self.journal_capacity == 0 {
            return;
        }
        if self.journal.len() == self.journal_capacity {
            self.journal.pop_front();
        }
        self.journal.push_back(LedgerEntry {
            kind,
            game,
            amount,
            balance_after: self.balance,
            at: Utc::now(),
        });
    }
}

impl Default for BalanceLedger {
    fn default() -> Self {
        Self::new(DEFAULT_OPENING_BALANCE)
    }
}
