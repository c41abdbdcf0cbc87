//! Flash Loan Core
//!
//! Transaction engine for uncollateralized loans that are borrowed, used and
//! repaid within one atomic operation.
//!
//! # Architecture
//!
//! - **Owned State**: `LedgerState` is passed by `&mut`, no ambient globals
//! - **Working Copy**: the borrow touches a local pool value only
//! - **Single Commit Point**: balances and history advance together or not at all
//! - **Events as Data**: the trace is returned, rendering belongs to the caller
//!
//! # Invariants
//!
//! - Conservation: committed attempts add `amount + interest` to the pool
//! - Rollback: aborted and rolled back attempts leave the pool untouched
//! - History: every well-formed attempt appends exactly one record

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod ledger;
pub mod engine;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    FailureReason, LoanRequest, LogEvent, Scenario, Severity, Stage, TerminalState,
    TransactionOutcome, TransactionRecord, TransactionStatus,
};
pub use ledger::{reset, snapshot, HistorySummary, LedgerSnapshot, LedgerState};
pub use engine::execute;
pub use actor::{spawn_pool_actor, PoolHandle};
pub use config::Config;
pub use metrics::Metrics;
