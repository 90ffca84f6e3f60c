//! Verifier tracks, currency tracks with their rate-version histories,
//! intents, and the verifier registry.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerifierTrack::Table)
                    .if_not_exists()
                    .col(string(VerifierTrack::Id).primary_key())
                    .col(string(VerifierTrack::OrderId).not_null())
                    .col(string(VerifierTrack::LogId).not_null())
                    .col(big_integer(VerifierTrack::DepositId).not_null())
                    .col(string(VerifierTrack::Verifier).not_null())
                    .col(string(VerifierTrack::TransactionId).not_null())
                    .col(string(VerifierTrack::ParticipantId).not_null())
                    .col(string(VerifierTrack::PayeeDetailsHash).not_null())
                    .col(string(VerifierTrack::IntentGatingService).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verifier_track_deposit_id")
                    .table(VerifierTrack::Table)
                    .col(VerifierTrack::DepositId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CurrencyTrack::Table)
                    .if_not_exists()
                    .col(string(CurrencyTrack::Id).primary_key())
                    .col(string(CurrencyTrack::OrderId).not_null())
                    .col(string(CurrencyTrack::LogId).not_null())
                    .col(big_integer(CurrencyTrack::DepositId).not_null())
                    .col(string(CurrencyTrack::Verifier).not_null())
                    .col(string(CurrencyTrack::Currency).not_null())
                    .col(string(CurrencyTrack::VerifierTrackId).not_null())
                    .col(string(CurrencyTrack::CurrentRateVersionId).not_null())
                    .col(string(CurrencyTrack::TransactionId).not_null())
                    .col(string(CurrencyTrack::ParticipantId).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_currency_track_verifier_track_id")
                    .table(CurrencyTrack::Table)
                    .col(CurrencyTrack::VerifierTrackId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RateVersion::Table)
                    .if_not_exists()
                    .col(string(RateVersion::Id).primary_key())
                    .col(string(RateVersion::OrderId).not_null())
                    .col(string(RateVersion::LogId).not_null())
                    .col(string(RateVersion::CurrencyTrackId).not_null())
                    .col(string(RateVersion::VerifierTrackId).not_null())
                    .col(big_integer(RateVersion::DepositId).not_null())
                    .col(string(RateVersion::Verifier).not_null())
                    .col(string(RateVersion::Currency).not_null())
                    .col(integer(RateVersion::ChangeId).not_null())
                    .col(string(RateVersion::Value).not_null())
                    .col(boolean(RateVersion::Active).not_null())
                    .col(string(RateVersion::TransactionId).not_null())
                    .to_owned(),
            )
            .await?;

        // Unique per track: change ids are gapless and never reused
        manager
            .create_index(
                Index::create()
                    .name("idx_rate_version_track_change")
                    .table(RateVersion::Table)
                    .col(RateVersion::CurrencyTrackId)
                    .col(RateVersion::ChangeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Intent::Table)
                    .if_not_exists()
                    .col(string(Intent::IntentHash).primary_key())
                    .col(string(Intent::OrderId).not_null())
                    .col(string(Intent::LogId).not_null())
                    .col(big_integer(Intent::DepositId).not_null())
                    .col(string(Intent::Verifier).not_null())
                    .col(string(Intent::Owner).not_null())
                    .col(string(Intent::ToAddress).not_null())
                    .col(string(Intent::Amount).not_null())
                    .col(string(Intent::Currency).not_null())
                    .col(string(Intent::VerifierTrackId).not_null())
                    .col(string(Intent::CurrencyTrackId).not_null())
                    .col(string(Intent::RateVersionId).not_null())
                    .col(string(Intent::State).not_null())
                    .col(string_null(Intent::SustainabilityFee))
                    .col(string_null(Intent::VerifierFee))
                    .col(string_null(Intent::ResolvedLogId))
                    .col(string(Intent::TransactionId).not_null())
                    .col(string(Intent::ParticipantId).not_null())
                    .to_owned(),
            )
            .await?;

        // Index for listing a deposit's in-flight intents
        manager
            .create_index(
                Index::create()
                    .name("idx_intent_deposit_state")
                    .table(Intent::Table)
                    .col(Intent::DepositId)
                    .col(Intent::State)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentVerifier::Table)
                    .if_not_exists()
                    .col(string(PaymentVerifier::Verifier).primary_key())
                    .col(string(PaymentVerifier::FeeShare).not_null())
                    .col(boolean(PaymentVerifier::Active).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayeeDetails::Table)
                    .if_not_exists()
                    .col(string(PayeeDetails::Id).primary_key())
                    .col(string(PayeeDetails::IntentGatingService).not_null())
                    .col(string(PayeeDetails::PayeeDetails).not_null())
                    .col(string(PayeeDetails::Data).not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayeeDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentVerifier::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Intent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RateVersion::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CurrencyTrack::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VerifierTrack::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VerifierTrack {
    Table,
    Id,
    OrderId,
    LogId,
    DepositId,
    Verifier,
    TransactionId,
    ParticipantId,
    PayeeDetailsHash,
    IntentGatingService,
}

#[derive(DeriveIden)]
enum CurrencyTrack {
    Table,
    Id,
    OrderId,
    LogId,
    DepositId,
    Verifier,
    Currency,
    VerifierTrackId,
    CurrentRateVersionId,
    TransactionId,
    ParticipantId,
}

#[derive(DeriveIden)]
enum RateVersion {
    Table,
    Id,
    OrderId,
    LogId,
    CurrencyTrackId,
    VerifierTrackId,
    DepositId,
    Verifier,
    Currency,
    ChangeId,
    Value,
    Active,
    TransactionId,
}

#[derive(DeriveIden)]
enum Intent {
    Table,
    IntentHash,
    OrderId,
    LogId,
    DepositId,
    Verifier,
    Owner,
    ToAddress,
    Amount,
    Currency,
    VerifierTrackId,
    CurrencyTrackId,
    RateVersionId,
    State,
    SustainabilityFee,
    VerifierFee,
    ResolvedLogId,
    TransactionId,
    ParticipantId,
}

#[derive(DeriveIden)]
enum PaymentVerifier {
    Table,
    Verifier,
    FeeShare,
    Active,
}

#[derive(DeriveIden)]
enum PayeeDetails {
    Table,
    Id,
    IntentGatingService,
    PayeeDetails,
    Data,
}
