//! Deposit state and its per-mutation audit trail.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deposit::Table)
                    .if_not_exists()
                    .col(big_integer(Deposit::DepositId).primary_key())
                    .col(string(Deposit::OrderId).not_null())
                    .col(string(Deposit::LogId).not_null())
                    .col(string(Deposit::TransactionId).not_null())
                    .col(string(Deposit::Token).not_null())
                    .col(string(Deposit::ParticipantId).not_null())
                    .col(string(Deposit::Deposited).not_null())
                    .col(string(Deposit::Remaining).not_null())
                    .col(string(Deposit::MinAmount).not_null())
                    .col(string(Deposit::MaxAmount).not_null())
                    .col(string(Deposit::Status).not_null())
                    .to_owned(),
            )
            .await?;

        // Index for listing open deposits
        manager
            .create_index(
                Index::create()
                    .name("idx_deposit_status")
                    .table(Deposit::Table)
                    .col(Deposit::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DepositDelta::Table)
                    .if_not_exists()
                    .col(string(DepositDelta::OrderId).primary_key())
                    .col(string(DepositDelta::LogId).not_null())
                    .col(big_integer(DepositDelta::DepositId).not_null())
                    .col(string(DepositDelta::AmountBefore).not_null())
                    .col(string(DepositDelta::Delta).not_null())
                    .col(string(DepositDelta::AmountAfter).not_null())
                    .to_owned(),
            )
            .await?;

        // Index for replaying a deposit's balance history
        manager
            .create_index(
                Index::create()
                    .name("idx_deposit_delta_deposit_id")
                    .table(DepositDelta::Table)
                    .col(DepositDelta::DepositId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DepositDelta::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deposit::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Deposit {
    Table,
    DepositId,
    OrderId,
    LogId,
    TransactionId,
    Token,
    ParticipantId,
    Deposited,
    Remaining,
    MinAmount,
    MaxAmount,
    Status,
}

#[derive(DeriveIden)]
enum DepositDelta {
    Table,
    OrderId,
    LogId,
    DepositId,
    AmountBefore,
    Delta,
    AmountAfter,
}
