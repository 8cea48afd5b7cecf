//! Periodic task supervision.
//!
//! Each task is an independent interval loop over the shared engine; a
//! failed tick is logged and the loop keeps running, so one bad cycle
//! never stops future ones. The first tick of each interval fires
//! immediately on startup.

use crate::engine::MarketEngine;
use crate::noise::NoiseSource;
use chrono::Utc;
use shared::MarketConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

pub fn spawn_market_tasks<N>(
    engine: Arc<Mutex<MarketEngine<N>>>,
    cfg: MarketConfig,
) -> Vec<JoinHandle<()>>
where
    N: NoiseSource + Send + Sync + 'static,
{
    vec![
        spawn_creation_task(engine.clone(), cfg),
        spawn_update_task(engine.clone(), cfg),
        spawn_checkpoint_task(engine, cfg),
    ]
}

fn spawn_creation_task<N>(
    engine: Arc<Mutex<MarketEngine<N>>>,
    cfg: MarketConfig,
) -> JoinHandle<()>
where
    N: NoiseSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cfg.interval_secs as u64));
        loop {
            interval.tick().await;
            let now = Utc::now().timestamp();
            let mut engine = engine.lock().await;
            if let Err(err) = engine.create_tick(now).await {
                warn!("Candle creation tick failed: {err:#}");
            }
        }
    })
}

fn spawn_update_task<N>(
    engine: Arc<Mutex<MarketEngine<N>>>,
    cfg: MarketConfig,
) -> JoinHandle<()>
where
    N: NoiseSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cfg.update_secs));
        loop {
            interval.tick().await;
            let mut engine = engine.lock().await;
            if let Err(err) = engine.update_tick().await {
                warn!("Candle update tick failed: {err:#}");
            }
        }
    })
}

fn spawn_checkpoint_task<N>(
    engine: Arc<Mutex<MarketEngine<N>>>,
    cfg: MarketConfig,
) -> JoinHandle<()>
where
    N: NoiseSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cfg.checkpoint_secs));
        loop {
            interval.tick().await;
            let engine = engine.lock().await;
            if let Err(err) = engine.checkpoint_regime().await {
                warn!("Regime checkpoint failed: {err:#}");
            }
        }
    })
}
