//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the engine.
//!
//! # Metrics
//!
//! - `flashloan_transactions_total{outcome}` - Attempts by terminal state
//! - `flashloan_loan_amount` - Histogram of requested principals
//! - `flashloan_actor_profit_total` - Net profit credited on commit
//! - `flashloan_pool_balance` - Pool balance after the last attempt

use crate::types::TransactionOutcome;
use crate::Result;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Attempts by outcome label
    pub transactions_total: IntCounterVec,

    /// Requested principal histogram
    pub loan_amount: Histogram,

    /// Cumulative committed profit
    pub actor_profit_total: Counter,

    /// Pool balance gauge
    pub pool_balance: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("pool_balance", &self.pool_balance.get())
            .field("actor_profit_total", &self.actor_profit_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounterVec::new(
            Opts::new(
                "flashloan_transactions_total",
                "Flash loan attempts by terminal state",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let loan_amount = Histogram::with_opts(
            HistogramOpts::new("flashloan_loan_amount", "Histogram of requested principals")
                .buckets(vec![
                    1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0, 250_000.0, 500_000.0,
                    1_000_000.0,
                ]),
        )?;
        registry.register(Box::new(loan_amount.clone()))?;

        let actor_profit_total = Counter::new(
            "flashloan_actor_profit_total",
            "Net profit credited to the actor on commit",
        )?;
        registry.register(Box::new(actor_profit_total.clone()))?;

        let pool_balance = Gauge::new(
            "flashloan_pool_balance",
            "Pool balance after the last attempt",
        )?;
        registry.register(Box::new(pool_balance.clone()))?;

        Ok(Self {
            transactions_total,
            loan_amount,
            actor_profit_total,
            pool_balance,
            registry,
        })
    }

    /// Record one finished attempt
    pub fn record(&self, loan_amount: Decimal, outcome: &TransactionOutcome, pool_balance: Decimal) {
        self.transactions_total
            .with_label_values(&[outcome.terminal.as_str()])
            .inc();
        self.loan_amount.observe(loan_amount.to_f64().unwrap_or(0.0));

        let profit = outcome.net_profit.to_f64().unwrap_or(0.0);
        if profit > 0.0 {
            self.actor_profit_total.inc_by(profit);
        }

        self.set_pool_balance(pool_balance);
    }

    /// Update the pool gauge (after reset, etc.)
    pub fn set_pool_balance(&self, pool_balance: Decimal) {
        self.pool_balance.set(pool_balance.to_f64().unwrap_or(0.0));
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        let text = String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scenario, TerminalState, TransactionRecord};

    fn outcome(terminal: TerminalState, net_profit: Decimal) -> TransactionOutcome {
        TransactionOutcome {
            committed: terminal == TerminalState::Committed,
            net_profit,
            events: vec![],
            history_record: TransactionRecord::reverted(
                Scenario::CollateralSwap,
                Decimal::from(1000),
                Decimal::ZERO,
            ),
            terminal,
            failure: None,
        }
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry, so two can coexist
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.set_pool_balance(Decimal::from(10));
        assert_eq!(second.pool_balance.get(), 0.0);
    }

    #[test]
    fn test_record_outcomes() {
        let metrics = Metrics::new().unwrap();

        metrics.record(
            Decimal::from(100_000),
            &outcome(TerminalState::Committed, Decimal::from(1410)),
            Decimal::from(1_100_090),
        );
        metrics.record(
            Decimal::from(100_000),
            &outcome(TerminalState::RolledBack, Decimal::ZERO),
            Decimal::from(1_100_090),
        );

        assert_eq!(metrics.transactions_total.with_label_values(&["committed"]).get(), 1);
        assert_eq!(metrics.transactions_total.with_label_values(&["rolled_back"]).get(), 1);
        assert_eq!(metrics.transactions_total.with_label_values(&["aborted"]).get(), 0);
        assert_eq!(metrics.actor_profit_total.get(), 1410.0);
        assert_eq!(metrics.pool_balance.get(), 1_100_090.0);
        assert_eq!(metrics.loan_amount.get_sample_count(), 2);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("flashloan_transactions_total"));
        assert!(text.contains("flashloan_pool_balance 1100090"));
    }
}
