//! Ledger state: pool liquidity, actor profit, and transaction history
//!
//! The state is an explicitly owned value. The engine borrows it mutably for
//! the duration of one attempt and writes to it only at the commit point.
//!
//! # Example
//!
//! ```
//! use flashloan_core::{LedgerState, LoanRequest, Scenario};
//! use rust_decimal::Decimal;
//!
//! let mut ledger = LedgerState::new(Decimal::from(1_000_000)).unwrap();
//! let request = LoanRequest::new(
//!     Decimal::from(100_000),
//!     Decimal::new(9, 2),
//!     Decimal::new(15, 1),
//!     Scenario::LegitimateArbitrage,
//! );
//!
//! let outcome = flashloan_core::execute(request, &mut ledger).unwrap();
//! assert!(outcome.committed);
//! assert_eq!(ledger.snapshot().history.len(), 1);
//! ```

use crate::types::TransactionRecord;
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Pool and profit ledger for a single actor
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// Liquidity currently available to lend
    pool_balance: Decimal,

    /// Reference balance set at creation, restored on reset
    initial_balance: Decimal,

    /// Cumulative net profit across committed attempts
    actor_profit: Decimal,

    /// Append-only attempt history
    history: Vec<TransactionRecord>,
}

impl LedgerState {
    /// Create ledger with the pool at `initial_balance`
    pub fn new(initial_balance: Decimal) -> Result<Self> {
        if initial_balance.is_sign_negative() && !initial_balance.is_zero() {
            return Err(Error::InvalidRequest(format!(
                "Initial pool balance must not be negative, got {}",
                initial_balance
            )));
        }

        Ok(Self {
            pool_balance: initial_balance,
            initial_balance,
            actor_profit: Decimal::ZERO,
            history: Vec::new(),
        })
    }

    /// Current `(pool_balance, initial_balance, actor_profit)`
    pub fn current(&self) -> (Decimal, Decimal, Decimal) {
        (self.pool_balance, self.initial_balance, self.actor_profit)
    }

    /// Liquidity available to lend
    pub fn pool_balance(&self) -> Decimal {
        self.pool_balance
    }

    /// Reference balance
    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    /// Cumulative actor profit
    pub fn actor_profit(&self) -> Decimal {
        self.actor_profit
    }

    /// Attempt history, oldest first
    pub fn history(&self) -> &[TransactionRecord] {
        &self.history
    }

    /// Apply a committed attempt
    ///
    /// The pool receives the full repayment and the actor is credited with
    /// `net_profit`. Both fields change together or not at all.
    pub(crate) fn apply_commit(
        &mut self,
        net_profit: Decimal,
        required_repayment: Decimal,
        loan_amount: Decimal,
    ) -> Result<()> {
        if required_repayment < loan_amount {
            return Err(Error::InvariantViolation(format!(
                "Repayment {} is below principal {}",
                required_repayment, loan_amount
            )));
        }

        if net_profit.is_sign_negative() && !net_profit.is_zero() {
            return Err(Error::InvariantViolation(format!(
                "Committed attempt cannot carry a loss, got {}",
                net_profit
            )));
        }

        let pool_balance = self.pool_balance.checked_add(required_repayment).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "Pool balance {} plus repayment {} overflows",
                self.pool_balance, required_repayment
            ))
        })?;
        let actor_profit = self.actor_profit.checked_add(net_profit).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "Actor profit {} plus {} overflows",
                self.actor_profit, net_profit
            ))
        })?;

        self.pool_balance = pool_balance;
        self.actor_profit = actor_profit;
        Ok(())
    }

    /// Append a history record
    pub(crate) fn append_record(&mut self, record: TransactionRecord) {
        self.history.push(record);
    }

    /// Restore the pool, zero the profit, clear the history
    pub fn reset(&mut self) {
        self.pool_balance = self.initial_balance;
        self.actor_profit = Decimal::ZERO;
        self.history.clear();

        info!(pool_balance = %self.pool_balance, "Ledger reset");
    }

    /// Read-only copy of the whole state
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            pool_balance: self.pool_balance,
            initial_balance: self.initial_balance,
            actor_profit: self.actor_profit,
            history: self.history.clone(),
        }
    }

    /// Check conservation invariants against the history
    ///
    /// - Pool balance is never negative
    /// - Actor profit equals the sum of committed profits
    /// - Pool balance equals initial balance plus every committed repayment
    pub fn check_invariants(&self) -> Result<()> {
        if self.pool_balance.is_sign_negative() && !self.pool_balance.is_zero() {
            error!(pool_balance = %self.pool_balance, "Negative pool balance");
            return Err(Error::InvariantViolation(format!(
                "Pool balance is negative: {}",
                self.pool_balance
            )));
        }

        let committed = self.history.iter().filter(|r| r.is_success());

        let mut expected_profit = Decimal::ZERO;
        let mut expected_pool = self.initial_balance;
        for record in committed {
            let totals = expected_profit.checked_add(record.profit).zip(
                record
                    .loan_amount
                    .checked_add(record.interest)
                    .and_then(|repaid| expected_pool.checked_add(repaid)),
            );
            let Some((profit, pool)) = totals else {
                return Err(Error::InvariantViolation(
                    "History totals overflow the decimal range".to_string(),
                ));
            };
            expected_profit = profit;
            expected_pool = pool;
        }

        if expected_profit != self.actor_profit {
            error!(
                expected = %expected_profit,
                actual = %self.actor_profit,
                "Actor profit diverged from history"
            );
            return Err(Error::InvariantViolation(format!(
                "Actor profit {} does not match history total {}",
                self.actor_profit, expected_profit
            )));
        }

        if expected_pool != self.pool_balance {
            error!(
                expected = %expected_pool,
                actual = %self.pool_balance,
                "Pool balance diverged from history"
            );
            return Err(Error::InvariantViolation(format!(
                "Pool balance {} does not match history total {}",
                self.pool_balance, expected_pool
            )));
        }

        Ok(())
    }
}

/// Restore `ledger` to its initial state
pub fn reset(ledger: &mut LedgerState) {
    ledger.reset();
}

/// Read-only view of `ledger`
pub fn snapshot(ledger: &LedgerState) -> LedgerSnapshot {
    ledger.snapshot()
}

/// Point-in-time copy of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Liquidity available to lend
    pub pool_balance: Decimal,

    /// Reference balance
    pub initial_balance: Decimal,

    /// Cumulative actor profit
    pub actor_profit: Decimal,

    /// Attempt history, oldest first
    pub history: Vec<TransactionRecord>,
}

impl LedgerSnapshot {
    /// Pool balance as a percentage of the initial balance
    pub fn utilization_pct(&self) -> Option<Decimal> {
        if self.initial_balance.is_zero() {
            return None;
        }
        Some(self.pool_balance / self.initial_balance * Decimal::ONE_HUNDRED)
    }

    /// Success/revert counts over the history
    pub fn summary(&self) -> HistorySummary {
        let total = self.history.len();
        let successful = self.history.iter().filter(|r| r.is_success()).count();

        let success_rate_pct = if total == 0 {
            None
        } else {
            Some(Decimal::from(successful) / Decimal::from(total) * Decimal::ONE_HUNDRED)
        };

        HistorySummary {
            total,
            successful,
            reverted: total - successful,
            success_rate_pct,
        }
    }
}

/// Aggregate view of the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Number of attempts
    pub total: usize,

    /// Committed attempts
    pub successful: usize,

    /// Aborted or rolled back attempts
    pub reverted: usize,

    /// `successful / total * 100`, absent for an empty history
    pub success_rate_pct: Option<Decimal>,
}
