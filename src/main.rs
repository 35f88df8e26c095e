use habit_settlement::bootstrap;
use habit_settlement::config::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,habit_settlement=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting habit settlement daemon");

    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let state = bootstrap::initialize_app_state(&config).await?;

    let handle = state.scheduler.start();
    info!(
        "✅ Settlement scheduler started (daily at {:02}:00 UTC)",
        config.settlement_hour
    );

    handle.await?;

    Ok(())
}
