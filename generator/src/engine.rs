//! The generator instance: regime, current-candle handle, and the three
//! periodic tick bodies.

use crate::candle::{Candle, CandlePatch};
use crate::noise::NoiseSource;
use crate::regime::Regime;
use crate::store::{MarketStore, StoreError};
use crate::synth::{self, PriceBand};
use anyhow::Result;
use shared::MarketConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns all mutable generator state. In-memory state (regime, current
/// candle) is committed only after a tick's persistence succeeds, so a
/// failed tick leaves the instance exactly as it was.
pub struct MarketEngine<N> {
    store: Arc<dyn MarketStore>,
    noise: N,
    cfg: MarketConfig,
    band: PriceBand,
    regime: Regime,
    current: Option<Candle>,
}

impl<N: NoiseSource> MarketEngine<N> {
    pub fn new(store: Arc<dyn MarketStore>, noise: N, cfg: MarketConfig) -> Self {
        let band = PriceBand::new(cfg.price_floor, cfg.price_ceil);
        MarketEngine {
            store,
            noise,
            cfg,
            band,
            regime: Regime::zero(),
            current: None,
        }
    }

    /// Quantizes a wall-clock instant (unix seconds) to its bucket start.
    pub fn bucket_time(&self, now_secs: i64) -> i64 {
        now_secs / self.cfg.interval_secs * self.cfg.interval_secs
    }

    pub fn current_candle(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Restores the persisted regime, writing a zero-state checkpoint when
    /// the row is missing or unreadable. Runs before any periodic task is
    /// armed so the first tick prices against the checkpointed state.
    pub async fn restore_regime(&mut self) -> Result<()> {
        match self.store.load_regime().await? {
            Some(record) => match Regime::from_record(&record) {
                Some(regime) => {
                    self.regime = regime;
                    info!(
                        trend = record.trend,
                        duration = record.duration,
                        "Restored market regime"
                    );
                }
                None => {
                    warn!(trend = record.trend, "Discarding malformed regime checkpoint");
                    self.regime = Regime::zero();
                    self.store.upsert_regime(&self.regime.to_record()).await?;
                }
            },
            None => {
                self.regime = Regime::zero();
                self.store.upsert_regime(&self.regime.to_record()).await?;
            }
        }
        Ok(())
    }

    /// Creation tick: repair any gap since the last persisted candle, open
    /// the bucket containing `now_secs`, then trim history to the
    /// retention cap. A duplicate-key conflict means another writer opened
    /// the bucket first; its row is adopted as the current handle.
    pub async fn create_tick(&mut self, now_secs: i64) -> Result<()> {
        let bucket = self.bucket_time(now_secs);
        let last = self.store.latest_candle().await?;

        let mut regime = self.regime;
        let last_close = match &last {
            Some(last) => Some(self.repair_gap(last, bucket).await?),
            None => None,
        };

        let used = regime.tick(&mut self.noise);
        let candle = synth::next_candle(
            bucket,
            last_close,
            used,
            self.band,
            self.cfg.seed_price,
            &mut self.noise,
        );

        let current = match self.store.insert_candle(&candle).await {
            Ok(()) => {
                info!(time = bucket, open = candle.open, "Created new candle");
                self.trim_history().await?;
                candle
            }
            Err(StoreError::DuplicateKey(_)) => match self.store.candle_at(bucket).await? {
                Some(existing) => {
                    debug!(time = bucket, "Candle already exists for this bucket, adopting it");
                    existing
                }
                None => {
                    anyhow::bail!("candle for bucket {bucket} vanished after duplicate-key conflict")
                }
            },
            Err(err) => return Err(err.into()),
        };

        self.regime = regime;
        self.current = Some(current);
        Ok(())
    }

    /// Update tick: advance the still-open candle. No-op when no candle
    /// has been created yet.
    pub async fn update_tick(&mut self) -> Result<()> {
        let Some(current) = self.current.clone() else {
            return Ok(());
        };

        let mut regime = self.regime;
        let used = regime.tick(&mut self.noise);
        let updated = synth::advance_candle(&current, used, self.band, &mut self.noise);

        let persisted = self
            .store
            .update_candle(current.time, CandlePatch::from(&updated))
            .await?;
        match &persisted {
            Some(candle) => {
                debug!(time = candle.time, close = candle.close, "Updated current candle")
            }
            None => warn!(time = current.time, "Current candle missing from store, dropping handle"),
        }

        self.regime = regime;
        self.current = persisted;
        Ok(())
    }

    /// Persists the regime checkpoint. A failed write is only superseded
    /// by the next periodic attempt, never retried inline.
    pub async fn checkpoint_regime(&self) -> Result<()> {
        self.store.upsert_regime(&self.regime.to_record()).await?;
        Ok(())
    }

    /// Backfills every missed bucket between `last` and `bucket`, oldest
    /// first, each close seeding the next so the repaired segment is a
    /// continuous walk. Returns the close the new candle should open from.
    async fn repair_gap(&mut self, last: &Candle, bucket: i64) -> Result<f64> {
        let interval = self.cfg.interval_secs;
        if bucket - last.time < interval * 2 {
            return Ok(last.close);
        }

        let missed = (bucket - last.time) / interval;
        let mut seed = last.close;
        for i in 1..missed {
            let time = last.time + i * interval;
            let fill = synth::backfill_candle(time, seed, self.band, &mut self.noise);
            match self.store.insert_candle(&fill).await {
                Ok(()) => {}
                // A concurrent writer already repaired this bucket.
                Err(StoreError::DuplicateKey(_)) => {}
                Err(err) => return Err(err.into()),
            }
            seed = fill.close;
        }
        info!(from = last.time, to = bucket, backfilled = missed - 1, "Repaired candle gap");
        Ok(seed)
    }

    /// Deletes the oldest candles once the store exceeds the retention
    /// cap. Always trims from the oldest end, so the just-written and
    /// current candles are never touched.
    async fn trim_history(&self) -> Result<()> {
        let count = self.store.candle_count().await?;
        if count > self.cfg.retention_cap {
            let excess = count - self.cfg.retention_cap;
            let ids = self.store.oldest_candle_ids(excess).await?;
            self.store.delete_candles(&ids).await?;
            info!(deleted = ids.len(), "Trimmed candle history to retention cap");
        }
        Ok(())
    }
}
