//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

/// Regime checkpoint. A single row (fixed id) is upserted periodically by
/// the generator and read back at startup.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "market_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// -1 (down), 0 (sideways), 1 (up)
    pub trend: i32,
    pub strength: f64,
    pub duration: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
