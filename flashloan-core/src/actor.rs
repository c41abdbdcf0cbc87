//! Actor-based concurrency for the pool
//!
//! The engine itself is synchronous and takes the ledger by `&mut`. When
//! several tasks share one pool, the ledger is moved into a single Tokio
//! actor instead:
//! - One writer task owns the `LedgerState`
//! - Each `execute` runs to completion before the next message is taken,
//!   so the liquidity check, commit and history append form one critical
//!   section
//! - Bounded mailbox gives callers backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               PoolHandle (Clone)                      │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                PoolActor (Single Task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ LedgerState (pool, profit, history)            │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │               engine::execute()                       │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::engine;
use crate::ledger::{LedgerSnapshot, LedgerState};
use crate::metrics::Metrics;
use crate::types::{LoanRequest, TransactionOutcome};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the pool actor
#[derive(Debug)]
pub enum PoolMessage {
    /// Run one flash loan attempt
    Execute {
        /// Loan parameters
        request: LoanRequest,
        /// Outcome, or the contract violation that rejected the request
        response: oneshot::Sender<Result<TransactionOutcome>>,
    },

    /// Restore the initial state
    Reset {
        /// Signalled once the ledger is reset
        response: oneshot::Sender<()>,
    },

    /// Read a snapshot
    Snapshot {
        /// Snapshot taken between two attempts
        response: oneshot::Sender<LedgerSnapshot>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the ledger
pub struct PoolActor {
    /// Owned ledger state
    ledger: LedgerState,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<PoolMessage>,

    /// Optional metrics sink
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for PoolActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolActor")
            .field("ledger", &self.ledger)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl PoolActor {
    /// Create new actor
    pub fn new(
        ledger: LedgerState,
        mailbox: mpsc::Receiver<PoolMessage>,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            ledger,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                PoolMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }

        tracing::debug!(
            pool_balance = %self.ledger.pool_balance(),
            records = self.ledger.history().len(),
            "Pool actor stopped"
        );
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: PoolMessage) {
        match msg {
            PoolMessage::Execute { request, response } => {
                let amount = request.amount;
                let result = engine::execute(request, &mut self.ledger);

                match &result {
                    Ok(outcome) => {
                        if let Some(metrics) = &self.metrics {
                            metrics.record(amount, outcome, self.ledger.pool_balance());
                        }
                    }
                    Err(e) => tracing::error!("Rejected flash loan request: {}", e),
                }

                let _ = response.send(result);
            }

            PoolMessage::Reset { response } => {
                self.ledger.reset();
                if let Some(metrics) = &self.metrics {
                    metrics.set_pool_balance(self.ledger.pool_balance());
                }
                let _ = response.send(());
            }

            PoolMessage::Snapshot { response } => {
                let _ = response.send(self.ledger.snapshot());
            }

            PoolMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct PoolHandle {
    sender: mpsc::Sender<PoolMessage>,
}

impl PoolHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<PoolMessage>) -> Self {
        Self { sender }
    }

    async fn send(&self, msg: PoolMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    /// Execute a flash loan attempt
    pub async fn execute(&self, request: LoanRequest) -> Result<TransactionOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(PoolMessage::Execute {
            request,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Reset the pool
    pub async fn reset(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(PoolMessage::Reset { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Get a snapshot
    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(PoolMessage::Snapshot { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(PoolMessage::Shutdown).await
    }
}

/// Spawn the pool actor
pub fn spawn_pool_actor(
    ledger: LedgerState,
    mailbox_capacity: usize,
    metrics: Option<Metrics>,
) -> PoolHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = PoolActor::new(ledger, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    PoolHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scenario;
    use rust_decimal::Decimal;

    fn arbitrage(amount: i64) -> LoanRequest {
        LoanRequest::new(
            Decimal::from(amount),
            Decimal::new(9, 2),
            Decimal::new(15, 1),
            Scenario::LegitimateArbitrage,
        )
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let ledger = LedgerState::new(Decimal::from(1_000_000)).unwrap();
        let handle = spawn_pool_actor(ledger, 16, None);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_execute_and_snapshot() {
        let ledger = LedgerState::new(Decimal::from(1_000_000)).unwrap();
        let metrics = Metrics::new().unwrap();
        let handle = spawn_pool_actor(ledger, 16, Some(metrics.clone()));

        let outcome = handle.execute(arbitrage(100_000)).await.unwrap();
        assert!(outcome.committed);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.pool_balance, Decimal::from(1_100_090));
        assert_eq!(snapshot.actor_profit, Decimal::from(1410));
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(
            metrics.transactions_total.with_label_values(&["committed"]).get(),
            1
        );

        handle.reset().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.pool_balance, Decimal::from(1_000_000));
        assert!(snapshot.history.is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_callers_keep_books_consistent() {
        let ledger = LedgerState::new(Decimal::from(100_000)).unwrap();
        let handle = spawn_pool_actor(ledger, 4, None);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.execute(arbitrage(60_000)).await
            }));
        }

        for task in tasks {
            assert!(task.await.unwrap().unwrap().committed);
        }

        // 60,000 principal + 54 interest returned per commit, 846 net each
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.history.len(), 8);
        assert_eq!(
            snapshot.pool_balance,
            Decimal::from(100_000) + Decimal::from(60_054 * 8)
        );
        assert_eq!(snapshot.actor_profit, Decimal::from(846 * 8));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_contract_violation_through_handle() {
        let ledger = LedgerState::new(Decimal::from(1_000_000)).unwrap();
        let handle = spawn_pool_actor(ledger, 16, None);

        let err = handle.execute(arbitrage(0)).await.unwrap_err();
        assert!(err.is_contract_violation());
        assert!(handle.snapshot().await.unwrap().history.is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_and_actor_are_debuggable() {
        let metrics = Metrics::new().unwrap();
        let (_sender, mailbox) = mpsc::channel(1);
        let actor = PoolActor::new(
            LedgerState::new(Decimal::from(500)).unwrap(),
            mailbox,
            Some(metrics.clone()),
        );
        let rendered = format!("{actor:?}");
        assert!(rendered.starts_with("PoolActor"));
        assert!(rendered.contains("metrics: true"));
        assert!(format!("{metrics:?}").starts_with("Metrics"));

        let handle = spawn_pool_actor(LedgerState::new(Decimal::from(500)).unwrap(), 4, None);
        assert!(format!("{handle:?}").starts_with("PoolHandle"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_mailbox_reports_concurrency_error() {
        let ledger = LedgerState::new(Decimal::from(1_000_000)).unwrap();
        let handle = spawn_pool_actor(ledger, 16, None);
        handle.shutdown().await.unwrap();

        // Resolves once the actor has dropped its receiver
        handle.sender.closed().await;

        let err = handle.snapshot().await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }
}
