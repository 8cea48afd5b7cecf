//! Persistence port for candles and the regime checkpoint.
//!
//! The engine only ever talks to [`MarketStore`]; the SeaORM adapter is
//! the production implementation and tests substitute an in-memory one.

use crate::candle::{Candle, CandlePatch};
use crate::regime::MARKET_STATE_ID;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use shared::entity::{candles, market_state};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("candle already exists for bucket {0}")]
    DuplicateKey(i64),
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn latest_candle(&self) -> StoreResult<Option<Candle>>;
    async fn candle_at(&self, time: i64) -> StoreResult<Option<Candle>>;
    /// Inserts a new candle; the time bucket is the unique key.
    async fn insert_candle(&self, candle: &Candle) -> StoreResult<()>;
    /// Applies a partial update to the candle at `time` and returns the
    /// updated row, or `None` when the row is gone.
    async fn update_candle(&self, time: i64, patch: CandlePatch) -> StoreResult<Option<Candle>>;
    async fn candle_count(&self) -> StoreResult<u64>;
    /// Ids of the `limit` oldest candles, ascending by time.
    async fn oldest_candle_ids(&self, limit: u64) -> StoreResult<Vec<u64>>;
    async fn delete_candles(&self, ids: &[u64]) -> StoreResult<()>;
    async fn load_regime(&self) -> StoreResult<Option<market_state::Model>>;
    async fn upsert_regime(&self, record: &market_state::Model) -> StoreResult<()>;
}

pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MarketStore for SeaOrmStore {
    async fn latest_candle(&self) -> StoreResult<Option<Candle>> {
        let row = candles::Entity::find()
            .order_by_desc(candles::Column::Time)
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(Candle::from))
    }

    async fn candle_at(&self, time: i64) -> StoreResult<Option<Candle>> {
        let row = candles::Entity::find()
            .filter(candles::Column::Time.eq(time))
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(Candle::from))
    }

    async fn insert_candle(&self, candle: &Candle) -> StoreResult<()> {
        let row = candles::ActiveModel {
            time: ActiveValue::Set(candle.time),
            open: ActiveValue::Set(candle.open),
            high: ActiveValue::Set(candle.high),
            low: ActiveValue::Set(candle.low),
            close: ActiveValue::Set(candle.close),
            volume: ActiveValue::Set(candle.volume),
            ..Default::default()
        };
        match candles::Entity::insert(row).exec(self.db.as_ref()).await {
            Ok(_) => Ok(()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::DuplicateKey(candle.time))
                }
                _ => Err(err.into()),
            },
        }
    }

    async fn update_candle(&self, time: i64, patch: CandlePatch) -> StoreResult<Option<Candle>> {
        let Some(row) = candles::Entity::find()
            .filter(candles::Column::Time.eq(time))
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        let mut update: candles::ActiveModel = row.into();
        update.close = ActiveValue::Set(patch.close);
        update.high = ActiveValue::Set(patch.high);
        update.low = ActiveValue::Set(patch.low);
        update.volume = ActiveValue::Set(patch.volume);
        let updated = update.update(self.db.as_ref()).await?;
        Ok(Some(updated.into()))
    }

    async fn candle_count(&self) -> StoreResult<u64> {
        let count = candles::Entity::find().count(self.db.as_ref()).await?;
        Ok(count)
    }

    async fn oldest_candle_ids(&self, limit: u64) -> StoreResult<Vec<u64>> {
        let ids = candles::Entity::find()
            .select_only()
            .column(candles::Column::Id)
            .order_by_asc(candles::Column::Time)
            .limit(limit)
            .into_tuple::<u64>()
            .all(self.db.as_ref())
            .await?;
        Ok(ids)
    }

    async fn delete_candles(&self, ids: &[u64]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        candles::Entity::delete_many()
            .filter(candles::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn load_regime(&self) -> StoreResult<Option<market_state::Model>> {
        let row = market_state::Entity::find_by_id(MARKET_STATE_ID)
            .one(self.db.as_ref())
            .await?;
        Ok(row)
    }

    async fn upsert_regime(&self, record: &market_state::Model) -> StoreResult<()> {
        let row = market_state::ActiveModel {
            id: ActiveValue::Set(record.id),
            trend: ActiveValue::Set(record.trend),
            strength: ActiveValue::Set(record.strength),
            duration: ActiveValue::Set(record.duration),
        };
        market_state::Entity::insert(row)
            .on_conflict(
                OnConflict::column(market_state::Column::Id)
                    .update_columns([
                        market_state::Column::Trend,
                        market_state::Column::Strength,
                        market_state::Column::Duration,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
