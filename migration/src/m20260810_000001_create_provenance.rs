//! Chain provenance tables: blocks, transactions, participants, the
//! business-event journal and the applied-event idempotency ledger.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Block::Table)
                    .if_not_exists()
                    .col(string(Block::Id).primary_key())
                    .col(big_integer(Block::ChainId).not_null())
                    .col(big_integer(Block::Number).not_null())
                    .col(big_integer(Block::Timestamp).not_null())
                    .col(string(Block::Hash).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transaction::Table)
                    .if_not_exists()
                    .col(string(Transaction::Id).primary_key())
                    .col(string(Transaction::BlockId).not_null())
                    .col(string(Transaction::Hash).not_null())
                    .col(integer(Transaction::Index).not_null())
                    .col(string(Transaction::FromAddress).not_null())
                    .col(string(Transaction::ToAddress).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Participant::Table)
                    .if_not_exists()
                    .col(string(Participant::Id).primary_key())
                    .col(big_integer(Participant::ChainId).not_null())
                    .col(string(Participant::Address).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Action::Table)
                    .if_not_exists()
                    .col(string(Action::Id).primary_key())
                    .col(string(Action::LogId).not_null())
                    .col(string(Action::ParticipantId).not_null())
                    .col(string(Action::TransactionId).not_null())
                    .col(big_integer(Action::DepositId).not_null())
                    .col(string(Action::Event).not_null())
                    .to_owned(),
            )
            .await?;

        // Index for listing a deposit's history in event order
        manager
            .create_index(
                Index::create()
                    .name("idx_action_deposit_id")
                    .table(Action::Table)
                    .col(Action::DepositId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AppliedEvent::Table)
                    .if_not_exists()
                    .col(string(AppliedEvent::Id).primary_key())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppliedEvent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Action::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participant::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transaction::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Block::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Block {
    Table,
    Id,
    ChainId,
    Number,
    Timestamp,
    Hash,
}

#[derive(DeriveIden)]
enum Transaction {
    Table,
    Id,
    BlockId,
    Hash,
    Index,
    FromAddress,
    ToAddress,
}

#[derive(DeriveIden)]
enum Participant {
    Table,
    Id,
    ChainId,
    Address,
}

#[derive(DeriveIden)]
enum Action {
    Table,
    Id,
    LogId,
    ParticipantId,
    TransactionId,
    DepositId,
    Event,
}

#[derive(DeriveIden)]
enum AppliedEvent {
    Table,
    Id,
}
