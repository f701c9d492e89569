use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    ledger::LedgerRepository,
    rewards::RewardClaimProcessor,
    settlement::SettlementEngine,
    withdrawal::{EligibilityGate, WithdrawalProcessor},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    // Ledger store is the leaf every engine hangs off
    let ledger = Arc::new(LedgerRepository::new(pool));

    let settlement = Arc::new(SettlementEngine::new(ledger.clone(), &config.ledger));
    info!(
        "✅ Settlement engine initialized (maturation delay: {}s)",
        config.ledger.maturation_delay.num_seconds()
    );

    let eligibility = Arc::new(EligibilityGate::new(ledger.clone(), &config.ledger));
    info!(
        "✅ Eligibility gate initialized (cooldown: {}s)",
        config.ledger.withdraw_cooldown.num_seconds()
    );

    let withdrawals = Arc::new(WithdrawalProcessor::new(
        ledger.clone(),
        settlement.clone(),
        eligibility.clone(),
        &config.ledger,
    ));
    info!("✅ Withdrawal processor initialized");

    let rewards = Arc::new(RewardClaimProcessor::new(ledger.clone(), &config.ledger));
    info!("✅ Reward claim processor initialized");

    Ok(AppState {
        ledger,
        settlement,
        eligibility,
        withdrawals,
        rewards,
        ledger_config: config.ledger.clone(),
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
