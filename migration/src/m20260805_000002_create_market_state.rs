use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketState::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MarketState::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(MarketState::Trend).integer().not_null().default(0)) // -1 down, 0 sideways, 1 up
                    .col(ColumnDef::new(MarketState::Strength).double().not_null().default(0.0))
                    .col(ColumnDef::new(MarketState::Duration).integer().not_null().default(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketState {
    Table,
    Id,
    Trend,
    Strength,
    Duration,
}
