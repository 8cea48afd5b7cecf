use anyhow::Result;
use generator::engine::MarketEngine;
use generator::noise::ThreadRngNoise;
use generator::scheduler;
use generator::store::SeaOrmStore;
use shared::{get_db_connection, Config};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting TradeSpot market generator...");

    let config = Config::from_env()?;
    let db = get_db_connection(&config.database_url).await?;
    let store = Arc::new(SeaOrmStore::new(Arc::new(db)));

    let mut engine = MarketEngine::new(store, ThreadRngNoise, config.market);
    engine.restore_regime().await?;
    info!("Market regime restored");

    let engine = Arc::new(Mutex::new(engine));
    let tasks = scheduler::spawn_market_tasks(engine, config.market);
    info!(
        interval_secs = config.market.interval_secs,
        update_secs = config.market.update_secs,
        checkpoint_secs = config.market.checkpoint_secs,
        "Generator tasks armed"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping generator tasks");
    for task in tasks {
        task.abort();
    }

    Ok(())
}
