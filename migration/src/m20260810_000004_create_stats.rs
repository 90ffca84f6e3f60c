//! Time-bucketed statistics counters.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stat::Table)
                    .if_not_exists()
                    .col(string(Stat::Id).primary_key())
                    .col(string(Stat::Width).not_null())
                    .col(big_integer(Stat::BucketStart).not_null())
                    .col(string(Stat::Action).not_null())
                    .col(string(Stat::Token).not_null())
                    .col(string_null(Stat::Currency))
                    .col(string(Stat::Verifier).not_null())
                    .col(string(Stat::Amount).not_null())
                    .to_owned(),
            )
            .await?;

        // Index for range scans over a time window
        manager
            .create_index(
                Index::create()
                    .name("idx_stat_width_bucket_start")
                    .table(Stat::Table)
                    .col(Stat::Width)
                    .col(Stat::BucketStart)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stat::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Stat {
    Table,
    Id,
    Width,
    BucketStart,
    Action,
    Token,
    Currency,
    Verifier,
    Amount,
}
