//! Transaction engine
//!
//! Runs one flash loan attempt against a ledger as a fixed sequence of stages:
//!
//! ```text
//! Pending ─┬─> Aborted (insufficient liquidity)
//!          └─> Borrowed ─> ScenarioApplied ─┬─> Committed
//!                                           └─> RolledBack
//! ```
//!
//! The borrow is applied to a local working pool only. The ledger is written
//! once, at the commit transition, and the history record is appended in the
//! same exclusive borrow. Events are returned as data; rendering them is the
//! caller's business.

use crate::ledger::LedgerState;
use crate::types::{
    format_usd, FailureReason, LoanRequest, LogEvent, Scenario, Severity, Stage, TerminalState,
    TransactionOutcome, TransactionRecord,
};
use crate::{Error, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Share of the principal burned moving the oracle price
pub const MANIPULATION_COST_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Ordered event buffer for one attempt
#[derive(Debug, Default)]
struct EventLog {
    events: Vec<LogEvent>,
}

impl EventLog {
    fn push(&mut self, stage: Stage, severity: Severity, message: impl Into<String>) {
        self.events.push(LogEvent {
            timestamp: Utc::now(),
            stage,
            message: message.into(),
            severity,
        });
    }

    fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Info, message);
    }

    fn success(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Success, message);
    }

    fn warning(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Warning, message);
    }

    fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Error, message);
    }

    fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}

fn overflow(what: &str) -> Error {
    Error::InvalidRequest(format!("{} overflows the decimal range", what))
}

/// `pct` percent of `amount`
fn percent_of(amount: Decimal, pct: Decimal) -> Result<Decimal> {
    amount
        .checked_mul(pct)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("Percentage"))
}

/// Interest owed on the principal
pub fn interest_for(request: &LoanRequest) -> Result<Decimal> {
    percent_of(request.amount, request.interest_rate_pct)
}

/// Principal plus interest
pub fn required_repayment(request: &LoanRequest) -> Result<Decimal> {
    request
        .amount
        .checked_add(interest_for(request)?)
        .ok_or_else(|| overflow("Required repayment"))
}

/// Every figure of one attempt, computed before anything is logged or written
#[derive(Debug, Clone, Copy)]
struct LoanFigures {
    interest: Decimal,
    required: Decimal,
    /// Yield extracted by the scenario
    profit: Decimal,
    manipulation_cost: Decimal,
    user_balance: Decimal,
}

impl LoanFigures {
    fn compute(request: &LoanRequest) -> Result<Self> {
        let amount = request.amount;
        let interest = interest_for(request)?;
        let required = required_repayment(request)?;

        let (profit, manipulation_cost) = match request.scenario {
            Scenario::LegitimateArbitrage => {
                (percent_of(amount, request.arbitrage_yield_pct)?, Decimal::ZERO)
            }
            Scenario::PriceManipulationExploit => (
                percent_of(amount, request.arbitrage_yield_pct)?,
                amount
                    .checked_mul(MANIPULATION_COST_RATE)
                    .ok_or_else(|| overflow("Manipulation cost"))?,
            ),
            // Guard stops the recursive borrow before any value moves
            Scenario::ReentrancyExploit | Scenario::CollateralSwap => (Decimal::ZERO, Decimal::ZERO),
        };

        let user_balance = amount
            .checked_add(profit)
            .and_then(|v| v.checked_sub(manipulation_cost))
            .ok_or_else(|| overflow("Scenario balance"))?;

        Ok(Self {
            interest,
            required,
            profit,
            manipulation_cost,
            user_balance,
        })
    }
}

/// Gross funds the actor holds after the scenario runs, before repayment
pub fn scenario_balance(request: &LoanRequest) -> Result<Decimal> {
    Ok(LoanFigures::compute(request)?.user_balance)
}

fn log_scenario(scenario: Scenario, figures: &LoanFigures, log: &mut EventLog) {
    let stage = Stage::Scenario;

    match scenario {
        Scenario::LegitimateArbitrage => {
            log.info(stage, "EXECUTING ARBITRAGE");
            log.info(stage, "Buy low on DEX A → Sell high on DEX B");
            log.success(stage, format!("✓ Arbitrage Profit: {}", format_usd(figures.profit)));
        }
        Scenario::PriceManipulationExploit => {
            log.warning(stage, "ATTEMPTING PRICE MANIPULATION");
            log.warning(stage, "Using flash loan to manipulate oracle price");
            log.warning(
                stage,
                format!("Manipulation Cost: {}", format_usd(figures.manipulation_cost)),
            );
            log.warning(stage, format!("Extracted Value: {}", format_usd(figures.profit)));
        }
        Scenario::ReentrancyExploit => {
            log.warning(stage, "ATTEMPTING REENTRANCY");
            log.warning(stage, "Trying to call borrow() again before repayment...");
            log.error(stage, "REENTRANCY GUARD TRIGGERED");
        }
        Scenario::CollateralSwap => {
            log.info(stage, "EXECUTING COLLATERAL SWAP");
            log.info(stage, "Repaying debt and swapping collateral atomically");
        }
    }
}

/// Execute one flash loan attempt against `ledger`
///
/// Returns `Err` only for contract violations (including figures that do not
/// fit the decimal range), in which case neither the balances nor the history
/// are touched. Every well-formed request yields a
/// [`TransactionOutcome`] and exactly one new history record.
pub fn execute(request: LoanRequest, ledger: &mut LedgerState) -> Result<TransactionOutcome> {
    request.validate()?;

    let amount = request.amount;
    let scenario = request.scenario;
    let figures = LoanFigures::compute(&request)?;
    let interest = figures.interest;
    let mut log = EventLog::default();

    log.info(Stage::Initiate, "INITIATING FLASH LOAN");
    log.info(Stage::Initiate, format!("Loan Amount: {}", format_usd(amount)));

    // Stage 1: liquidity check
    let pool_before = ledger.pool_balance();
    if amount > pool_before {
        log.error(Stage::Initiate, "❌ INSUFFICIENT LIQUIDITY IN POOL");
        log.error(Stage::Initiate, format!("Available: {}", format_usd(pool_before)));

        let record = TransactionRecord::reverted(scenario, amount, interest);
        ledger.append_record(record.clone());

        warn!(
            %amount,
            available = %pool_before,
            scenario = scenario.tag(),
            "Flash loan aborted: insufficient liquidity"
        );

        return Ok(TransactionOutcome {
            committed: false,
            net_profit: Decimal::ZERO,
            events: log.into_events(),
            history_record: record,
            terminal: TerminalState::Aborted,
            failure: Some(FailureReason::InsufficientLiquidity {
                available: pool_before,
            }),
        });
    }

    // Stage 2: borrow against a working copy
    let working_pool = pool_before - amount;
    log.success(Stage::Borrow, format!("✓ Borrowed {} from pool", format_usd(amount)));
    log.info(Stage::Borrow, format!("Pool Balance: {}", format_usd(working_pool)));
    debug!(%amount, %working_pool, "Borrowed");

    // Stage 3: scenario
    log_scenario(scenario, &figures, &mut log);
    let user_balance = figures.user_balance;
    debug!(scenario = scenario.tag(), %user_balance, "Scenario applied");

    // Stage 4: repayment
    let required = figures.required;
    log.info(Stage::Repayment, "REPAYMENT CALCULATION");
    log.info(Stage::Repayment, format!("Principal: {}", format_usd(amount)));
    log.info(
        Stage::Repayment,
        format!(
            "Interest ({}%): {}",
            request.interest_rate_pct.normalize(),
            format_usd(interest)
        ),
    );
    log.info(Stage::Repayment, format!("Total Required: {}", format_usd(required)));
    log.info(Stage::Repayment, format!("User Balance: {}", format_usd(user_balance)));

    // Stage 5: commit or rollback
    if user_balance >= required {
        let net_profit = user_balance - required;
        let record = TransactionRecord::success(scenario, amount, interest, net_profit);

        ledger.apply_commit(net_profit, required, amount)?;
        ledger.append_record(record.clone());

        log.success(Stage::Settlement, "✓ REPAYMENT SUCCESSFUL");
        log.success(Stage::Settlement, format!("Returned {} to pool", format_usd(required)));
        log.success(Stage::Settlement, "🎉 TRANSACTION COMMITTED");
        log.success(Stage::Settlement, format!("Net Profit: {}", format_usd(net_profit)));

        info!(
            %amount,
            %net_profit,
            pool_balance = %ledger.pool_balance(),
            scenario = scenario.tag(),
            "Flash loan committed"
        );

        Ok(TransactionOutcome {
            committed: true,
            net_profit,
            events: log.into_events(),
            history_record: record,
            terminal: TerminalState::Committed,
            failure: None,
        })
    } else {
        let shortfall = required - user_balance;
        let record = TransactionRecord::reverted(scenario, amount, interest);
        ledger.append_record(record.clone());

        log.error(Stage::Settlement, "❌ REPAYMENT FAILED");
        log.error(Stage::Settlement, format!("Shortfall: {}", format_usd(shortfall)));
        log.error(Stage::Settlement, "ROLLING BACK TRANSACTION");
        log.error(Stage::Settlement, "All state changes reverted");

        warn!(
            %amount,
            %shortfall,
            scenario = scenario.tag(),
            "Flash loan rolled back"
        );

        Ok(TransactionOutcome {
            committed: false,
            net_profit: Decimal::ZERO,
            events: log.into_events(),
            history_record: record,
            terminal: TerminalState::RolledBack,
            failure: Some(FailureReason::RepaymentShortfall { shortfall }),
        })
    }
}
