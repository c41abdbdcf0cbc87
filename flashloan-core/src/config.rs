//! Configuration for the flash loan sandbox

use crate::types::{LoanRequest, Scenario};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Pool balance at startup and after reset
    pub initial_balance: Decimal,

    /// Input bounds enforced by the presentation layer
    pub limits: RequestLimits,

    /// Trace rendering pace
    pub pacing: PacingConfig,

    /// Pool actor configuration
    pub actor: ActorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Scripted requests run by the sandbox binary
    pub requests: Vec<LoanRequest>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "flashloan-sandbox".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            initial_balance: Decimal::from(1_000_000),
            limits: RequestLimits::default(),
            pacing: PacingConfig::default(),
            actor: ActorConfig::default(),
            logging: LoggingConfig::default(),
            requests: default_requests(),
        }
    }
}

/// One run per scenario at the default slider positions
fn default_requests() -> Vec<LoanRequest> {
    Scenario::ALL
        .into_iter()
        .map(|scenario| {
            LoanRequest::new(
                Decimal::from(100_000),
                Decimal::new(9, 2),  // 0.09%
                Decimal::new(15, 1), // 1.5%
                scenario,
            )
        })
        .collect()
}

/// Accepted input ranges (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    /// Smallest loan accepted
    pub min_amount: Decimal,

    /// Largest loan accepted
    pub max_amount: Decimal,

    /// Highest interest rate (percent)
    pub max_interest_rate_pct: Decimal,

    /// Highest arbitrage yield (percent)
    pub max_arbitrage_yield_pct: Decimal,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            min_amount: Decimal::from(1_000),
            max_amount: Decimal::from(500_000),
            max_interest_rate_pct: Decimal::from(2),
            max_arbitrage_yield_pct: Decimal::from(25),
        }
    }
}

impl RequestLimits {
    /// Check a request against the configured ranges
    ///
    /// This is a boundary check; the engine does not call it.
    pub fn check(&self, request: &LoanRequest) -> Result<()> {
        request.validate()?;

        if request.amount < self.min_amount || request.amount > self.max_amount {
            return Err(Error::InvalidRequest(format!(
                "Loan amount {} outside [{}, {}]",
                request.amount, self.min_amount, self.max_amount
            )));
        }

        if request.interest_rate_pct > self.max_interest_rate_pct {
            return Err(Error::InvalidRequest(format!(
                "Interest rate {}% above maximum {}%",
                request.interest_rate_pct, self.max_interest_rate_pct
            )));
        }

        if request.arbitrage_yield_pct > self.max_arbitrage_yield_pct {
            return Err(Error::InvalidRequest(format!(
                "Arbitrage yield {}% above maximum {}%",
                request.arbitrage_yield_pct, self.max_arbitrage_yield_pct
            )));
        }

        Ok(())
    }
}

/// Trace rendering pace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause between stages when rendering
    pub enabled: bool,

    /// Pause length (milliseconds)
    pub stage_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stage_delay_ms: 300,
        }
    }
}

/// Pool actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,

    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", name, value, e)))
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(balance) = std::env::var("FLASHLOAN_INITIAL_BALANCE") {
            config.initial_balance = parse_env("FLASHLOAN_INITIAL_BALANCE", &balance)?;
        }

        if let Ok(delay) = std::env::var("FLASHLOAN_STAGE_DELAY_MS") {
            config.pacing.stage_delay_ms = parse_env("FLASHLOAN_STAGE_DELAY_MS", &delay)?;
        }

        if let Ok(level) = std::env::var("FLASHLOAN_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(json) = std::env::var("FLASHLOAN_LOG_JSON") {
            config.logging.json = parse_env("FLASHLOAN_LOG_JSON", &json)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine could never run
    pub fn validate(&self) -> Result<()> {
        if self.initial_balance.is_sign_negative() && !self.initial_balance.is_zero() {
            return Err(Error::Config(format!(
                "initial_balance must not be negative, got {}",
                self.initial_balance
            )));
        }

        if self.limits.min_amount > self.limits.max_amount {
            return Err(Error::Config(format!(
                "limits.min_amount {} exceeds limits.max_amount {}",
                self.limits.min_amount, self.limits.max_amount
            )));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(Error::Config("actor.mailbox_capacity must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "flashloan-sandbox");
        assert_eq!(config.initial_balance, Decimal::from(1_000_000));
        assert_eq!(config.pacing.stage_delay_ms, 300);
        assert_eq!(config.requests.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_limits_check() {
        let limits = RequestLimits::default();
        let request = LoanRequest::new(
            Decimal::from(100_000),
            Decimal::new(9, 2),
            Decimal::new(15, 1),
            Scenario::LegitimateArbitrage,
        );
        assert!(limits.check(&request).is_ok());

        let too_big = LoanRequest { amount: Decimal::from(500_001), ..request.clone() };
        assert!(limits.check(&too_big).is_err());

        let too_small = LoanRequest { amount: Decimal::from(999), ..request.clone() };
        assert!(limits.check(&too_small).is_err());

        let steep = LoanRequest { interest_rate_pct: Decimal::new(201, 2), ..request.clone() };
        assert!(limits.check(&steep).is_err());

        let greedy = LoanRequest { arbitrage_yield_pct: Decimal::new(251, 1), ..request };
        assert!(limits.check(&greedy).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
initial_balance = "250000"

[pacing]
enabled = false

[[requests]]
amount = "50000"
interest_rate_pct = "0.5"
arbitrage_yield_pct = "0"
scenario = "collateral_swap"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.initial_balance, Decimal::from(250_000));
        assert!(!config.pacing.enabled);
        assert_eq!(config.pacing.stage_delay_ms, 300);
        assert_eq!(config.requests.len(), 1);
        assert_eq!(config.requests[0].scenario, Scenario::CollateralSwap);
        assert_eq!(config.requests[0].interest_rate_pct, Decimal::new(5, 1));
        assert_eq!(config.limits.max_amount, Decimal::from(500_000));
    }

    #[test]
    fn test_from_file_rejects_unknown_scenario() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[requests]]
amount = "50000"
interest_rate_pct = "0.5"
arbitrage_yield_pct = "0"
scenario = "governance_attack"
"#
        )
        .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = Config::default();
        config.limits.min_amount = Decimal::from(10);
        config.limits.max_amount = Decimal::from(5);
        assert!(config.validate().is_err());
    }
}
