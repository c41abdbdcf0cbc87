//! Error types for the flash loan engine
//!
//! Business outcomes (insufficient liquidity, repayment shortfall) are not
//! errors: they come back inside a [`TransactionOutcome`](crate::TransactionOutcome).
//! Everything here is either API misuse or an infrastructure fault.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed loan request (non-positive amount, negative rate)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Scenario tag outside the closed scenario set
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Ledger invariant violation (conservation, negative pool, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for caller mistakes that must never reach the ledger
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::UnknownScenario(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_kinds() {
        assert!(Error::InvalidRequest("amount".into()).is_contract_violation());
        assert!(Error::UnknownScenario("flash".into()).is_contract_violation());
        assert!(!Error::Concurrency("closed".into()).is_contract_violation());
        assert!(!Error::InvariantViolation("pool".into()).is_contract_violation());
    }
}
