//! Flash loan sandbox: runs a scripted set of loans and renders the traces

use flashloan_core::config::PacingConfig;
use flashloan_core::types::format_usd;
use flashloan_core::{spawn_pool_actor, Config, LedgerState, Metrics, Stage, TransactionOutcome};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn render(outcome: &TransactionOutcome, pacing: &PacingConfig) {
    let mut last_stage: Option<Stage> = None;

    for event in &outcome.events {
        if pacing.enabled && last_stage.is_some_and(|stage| stage != event.stage) {
            tokio::time::sleep(Duration::from_millis(pacing.stage_delay_ms)).await;
        }
        last_stage = Some(event.stage);

        println!(
            "[{}] {:<5} {}",
            event.timestamp.format("%H:%M:%S"),
            event.severity.as_str(),
            event.message
        );
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    init_tracing(&config);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        initial_balance = %config.initial_balance,
        "Starting flash loan sandbox"
    );

    let metrics = Metrics::new()?;
    let ledger = LedgerState::new(config.initial_balance)?;
    let handle = spawn_pool_actor(ledger, config.actor.mailbox_capacity, Some(metrics.clone()));

    for request in &config.requests {
        if let Err(e) = config.limits.check(request) {
            tracing::warn!(scenario = request.scenario.tag(), "Skipping request: {}", e);
            continue;
        }

        println!("=== {} ===", request.scenario);
        let outcome = handle.execute(request.clone()).await?;
        render(&outcome, &config.pacing).await;
    }

    let snapshot = handle.snapshot().await?;
    let summary = snapshot.summary();

    println!("Pool Balance: {}", format_usd(snapshot.pool_balance));
    if let Some(pct) = snapshot.utilization_pct() {
        println!("  {}% of initial", pct.round_dp(1));
    }
    println!("Total Earned: {}", format_usd(snapshot.actor_profit));
    println!(
        "Successful: {}  Reverted: {}  Success Rate: {}",
        summary.successful,
        summary.reverted,
        summary
            .success_rate_pct
            .map(|pct| format!("{}%", pct.round_dp(0)))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    tracing::debug!("{}", metrics.gather_text()?);

    handle.shutdown().await?;
    tracing::info!("Shutting down flash loan sandbox");
    Ok(())
}
