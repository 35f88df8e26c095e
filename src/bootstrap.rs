use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::delivery::telegram::TelegramDeliverer;
use crate::error::AppResult;
use crate::settlement::scheduler::{ScheduleConfig, SettlementScheduler};
use crate::settlement::SettlementEngine;
use crate::store::postgres::PgStore;

pub struct AppState {
    pub engine: Arc<SettlementEngine>,
    pub scheduler: SettlementScheduler,
}

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    let store = Arc::new(PgStore::new(pool));
    info!("✅ Settlement store initialized");

    let deliverer = Arc::new(TelegramDeliverer::new(config.bot_token.clone()));
    info!("✅ Telegram deliverer initialized");

    let engine = Arc::new(SettlementEngine::new(store, deliverer));

    let scheduler = SettlementScheduler::new(
        ScheduleConfig {
            execution_hour: config.settlement_hour,
            reference_offset_minutes: config.reference_offset_minutes,
        },
        engine.clone(),
    );

    Ok(AppState { engine, scheduler })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
