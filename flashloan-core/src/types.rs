//! Core types for the flash loan engine
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money and percentages)
//! - Plain data (no behavior that touches the ledger)
//! - Serde round-trips for the presentation layer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How the borrowed funds are used inside the atomic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Buy low on one venue, sell high on another
    LegitimateArbitrage,
    /// Spend part of the loan moving an oracle price
    PriceManipulationExploit,
    /// Try to re-enter `borrow()` before repayment
    ReentrancyExploit,
    /// Repay debt and swap collateral in one step
    CollateralSwap,
}

impl Scenario {
    /// Every scenario, in display order
    pub const ALL: [Scenario; 4] = [
        Scenario::LegitimateArbitrage,
        Scenario::PriceManipulationExploit,
        Scenario::ReentrancyExploit,
        Scenario::CollateralSwap,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::LegitimateArbitrage => "Legitimate Arbitrage",
            Scenario::PriceManipulationExploit => "Exploit: Price Manipulation",
            Scenario::ReentrancyExploit => "Exploit: Reentrancy Attack",
            Scenario::CollateralSwap => "Collateral Swap",
        }
    }

    /// Machine tag (matches the serde representation)
    pub fn tag(&self) -> &'static str {
        match self {
            Scenario::LegitimateArbitrage => "legitimate_arbitrage",
            Scenario::PriceManipulationExploit => "price_manipulation_exploit",
            Scenario::ReentrancyExploit => "reentrancy_exploit",
            Scenario::CollateralSwap => "collateral_swap",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Scenario {
    type Err = crate::Error;

    /// Accepts either the label or the tag
    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.label() == s || scenario.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::UnknownScenario(s.to_string()))
    }
}

/// Parameters of one flash loan attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    /// Amount borrowed from the pool
    pub amount: Decimal,

    /// Interest charged on the principal, in percent
    pub interest_rate_pct: Decimal,

    /// Yield of the strategy, in percent of the principal
    pub arbitrage_yield_pct: Decimal,

    /// What the borrowed funds are used for
    pub scenario: Scenario,
}

impl LoanRequest {
    /// Create new request (unvalidated)
    pub fn new(
        amount: Decimal,
        interest_rate_pct: Decimal,
        arbitrage_yield_pct: Decimal,
        scenario: Scenario,
    ) -> Self {
        Self {
            amount,
            interest_rate_pct,
            arbitrage_yield_pct,
            scenario,
        }
    }

    /// Check the request contract
    pub fn validate(&self) -> crate::Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(crate::Error::InvalidRequest(format!(
                "Loan amount must be positive, got {}",
                self.amount
            )));
        }

        if self.interest_rate_pct.is_sign_negative() && !self.interest_rate_pct.is_zero() {
            return Err(crate::Error::InvalidRequest(format!(
                "Interest rate must not be negative, got {}",
                self.interest_rate_pct
            )));
        }

        if self.arbitrage_yield_pct.is_sign_negative() && !self.arbitrage_yield_pct.is_zero() {
            return Err(crate::Error::InvalidRequest(format!(
                "Arbitrage yield must not be negative, got {}",
                self.arbitrage_yield_pct
            )));
        }

        Ok(())
    }
}

/// Presentation hint attached to each trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine step
    Info,
    /// Step completed in the actor's favor
    Success,
    /// Exploit attempt in progress
    Warning,
    /// Failure or interception
    Error,
}

impl Severity {
    /// Fixed-width label for rendering
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Success => "OK",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Stage of the engine that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request accepted, liquidity checked
    Initiate,
    /// Funds moved out of the working pool
    Borrow,
    /// Scenario executed
    Scenario,
    /// Repayment computed
    Repayment,
    /// Commit or rollback
    Settlement,
}

/// One line of the transaction trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// When the event was produced
    pub timestamp: DateTime<Utc>,

    /// Producing stage
    pub stage: Stage,

    /// Message text
    pub message: String,

    /// Presentation severity
    pub severity: Severity,
}

/// Final status of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Repaid and committed
    Success,
    /// Aborted or rolled back
    Reverted,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => write!(f, "✓ Success"),
            TransactionStatus::Reverted => write!(f, "✗ Reverted"),
        }
    }
}

/// History entry, appended once per attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID (UUIDv7 for time-ordering)
    pub record_id: Uuid,

    /// Scenario that was attempted
    pub scenario: Scenario,

    /// Principal requested
    pub loan_amount: Decimal,

    /// Interest quoted on the principal
    pub interest: Decimal,

    /// Net profit credited (zero unless committed)
    pub profit: Decimal,

    /// Final status
    pub status: TransactionStatus,

    /// When the attempt finished
    pub recorded_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Record for a committed attempt
    pub fn success(scenario: Scenario, loan_amount: Decimal, interest: Decimal, profit: Decimal) -> Self {
        Self {
            record_id: Uuid::now_v7(),
            scenario,
            loan_amount,
            interest,
            profit,
            status: TransactionStatus::Success,
            recorded_at: Utc::now(),
        }
    }

    /// Record for an aborted or rolled back attempt
    pub fn reverted(scenario: Scenario, loan_amount: Decimal, interest: Decimal) -> Self {
        Self {
            record_id: Uuid::now_v7(),
            scenario,
            loan_amount,
            interest,
            profit: Decimal::ZERO,
            status: TransactionStatus::Reverted,
            recorded_at: Utc::now(),
        }
    }

    /// Check if the attempt committed
    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

/// Terminal state of the engine state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Rejected before borrowing
    Aborted,
    /// Repayment covered, ledger advanced
    Committed,
    /// Repayment short, ledger untouched
    RolledBack,
}

impl TerminalState {
    /// Label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::Aborted => "aborted",
            TerminalState::Committed => "committed",
            TerminalState::RolledBack => "rolled_back",
        }
    }
}

/// Why an attempt did not commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Pool could not cover the loan
    InsufficientLiquidity {
        /// Pool balance at the time of the check
        available: Decimal,
    },
    /// Funds after the scenario did not cover principal plus interest
    RepaymentShortfall {
        /// `required_repayment - user_balance`
        shortfall: Decimal,
    },
}

/// Everything `execute` hands back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// Whether the ledger advanced
    pub committed: bool,

    /// Profit credited to the actor (zero unless committed)
    pub net_profit: Decimal,

    /// Full trace, in execution order
    pub events: Vec<LogEvent>,

    /// Entry appended to the ledger history
    pub history_record: TransactionRecord,

    /// Terminal state reached
    pub terminal: TerminalState,

    /// Failure detail for non-committed attempts
    pub failure: Option<FailureReason>,
}

/// Format a money amount as `$1,234,567` (whole units, half-to-even)
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp(0);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
