//! Postgres ledger store
//!
//! sea-orm implementation of [`LedgerStore`]. Events are applied one at a
//! time by a single writer, so conditional writes use find-then-insert /
//! find-then-update rather than database-level conflict handling. Hashes and
//! ids persist as 0x-prefixed hex, amounts as signed decimal strings.
//!
//! The store is generic over the sea-orm connection so one implementation
//! covers both the pooled connection and an open database transaction; the
//! unit of work maps onto `TransactionTrait`, with an uncommitted
//! transaction rolling back on drop.

use alloy::primitives::{Address, B256, I256, U256};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, Set, TransactionTrait,
};

use crate::entities::{
    action, applied_event, block, currency_track, deposit, deposit_delta, intent, participant,
    payee_details, payment_verifier, prelude::*, rate_version, stat, transaction, verifier_track,
};
use crate::error::StoreError;
use crate::ids::{BucketWidth, LogId, OrderedEventId, RateVersionId, StatBucketId};
use crate::lifecycle::DepositStatus;

use super::{
    ActionRow, BlockRow, CurrencyTrackRow, DepositDeltaRow, DepositRow, IntentResolution,
    IntentRow, IntentState, LedgerStore, LedgerTransaction, ParticipantRow, PayeeDetailsRow,
    PaymentVerifierRow, RateVersionRow, StatRow, TransactionRow, VerifierTrackRow,
};

pub struct PgLedgerStore<C = DatabaseConnection> {
    db: C,
}

impl PgLedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn hex_of(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn corrupt(table: &'static str, detail: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        table,
        detail: detail.into(),
    }
}

fn parse_fixed<const N: usize>(table: &'static str, s: &str) -> Result<[u8; N], StoreError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes =
        hex::decode(stripped).map_err(|e| corrupt(table, format!("bad hex {}: {}", s, e)))?;
    bytes
        .try_into()
        .map_err(|_| corrupt(table, format!("bad id length: {}", s)))
}

fn parse_addr(table: &'static str, s: &str) -> Result<Address, StoreError> {
    s.parse()
        .map_err(|e| corrupt(table, format!("bad address {}: {}", s, e)))
}

fn parse_b256(table: &'static str, s: &str) -> Result<B256, StoreError> {
    s.parse()
        .map_err(|e| corrupt(table, format!("bad hash {}: {}", s, e)))
}

fn parse_u256(table: &'static str, s: &str) -> Result<U256, StoreError> {
    s.parse()
        .map_err(|e| corrupt(table, format!("bad amount {}: {}", s, e)))
}

fn parse_i256(table: &'static str, s: &str) -> Result<I256, StoreError> {
    s.parse()
        .map_err(|e| corrupt(table, format!("bad signed amount {}: {}", s, e)))
}

fn deposit_row_of(model: deposit::Model) -> Result<DepositRow, StoreError> {
    const T: &str = "deposit";
    Ok(DepositRow {
        deposit_id: model.deposit_id as u64,
        order_id: OrderedEventId(parse_fixed(T, &model.order_id)?),
        log_id: LogId(parse_fixed(T, &model.log_id)?),
        transaction_id: parse_b256(T, &model.transaction_id)?,
        token: parse_addr(T, &model.token)?,
        participant_id: parse_b256(T, &model.participant_id)?,
        deposited: parse_u256(T, &model.deposited)?,
        remaining: parse_i256(T, &model.remaining)?,
        min_amount: parse_u256(T, &model.min_amount)?,
        max_amount: parse_u256(T, &model.max_amount)?,
        status: DepositStatus::from_str(&model.status)
            .ok_or_else(|| corrupt(T, format!("bad status {}", model.status)))?,
    })
}

fn verifier_track_row_of(model: verifier_track::Model) -> Result<VerifierTrackRow, StoreError> {
    const T: &str = "verifier_track";
    Ok(VerifierTrackRow {
        id: parse_b256(T, &model.id)?,
        order_id: OrderedEventId(parse_fixed(T, &model.order_id)?),
        log_id: LogId(parse_fixed(T, &model.log_id)?),
        deposit_id: model.deposit_id as u64,
        verifier: parse_addr(T, &model.verifier)?,
        transaction_id: parse_b256(T, &model.transaction_id)?,
        participant_id: parse_b256(T, &model.participant_id)?,
        payee_details_hash: parse_b256(T, &model.payee_details_hash)?,
        intent_gating_service: parse_addr(T, &model.intent_gating_service)?,
    })
}

fn currency_track_row_of(model: currency_track::Model) -> Result<CurrencyTrackRow, StoreError> {
    const T: &str = "currency_track";
    Ok(CurrencyTrackRow {
        id: parse_b256(T, &model.id)?,
        order_id: OrderedEventId(parse_fixed(T, &model.order_id)?),
        log_id: LogId(parse_fixed(T, &model.log_id)?),
        deposit_id: model.deposit_id as u64,
        verifier: parse_addr(T, &model.verifier)?,
        currency: parse_b256(T, &model.currency)?,
        verifier_track_id: parse_b256(T, &model.verifier_track_id)?,
        current_rate_version_id: RateVersionId(parse_fixed(T, &model.current_rate_version_id)?),
        transaction_id: parse_b256(T, &model.transaction_id)?,
        participant_id: parse_b256(T, &model.participant_id)?,
    })
}

fn rate_version_row_of(model: rate_version::Model) -> Result<RateVersionRow, StoreError> {
    const T: &str = "rate_version";
    Ok(RateVersionRow {
        id: RateVersionId(parse_fixed(T, &model.id)?),
        order_id: OrderedEventId(parse_fixed(T, &model.order_id)?),
        log_id: LogId(parse_fixed(T, &model.log_id)?),
        currency_track_id: parse_b256(T, &model.currency_track_id)?,
        verifier_track_id: parse_b256(T, &model.verifier_track_id)?,
        deposit_id: model.deposit_id as u64,
        verifier: parse_addr(T, &model.verifier)?,
        currency: parse_b256(T, &model.currency)?,
        change_id: model.change_id as u32,
        value: parse_u256(T, &model.value)?,
        active: model.active,
        transaction_id: parse_b256(T, &model.transaction_id)?,
    })
}

fn intent_row_of(model: intent::Model) -> Result<IntentRow, StoreError> {
    const T: &str = "intent";
    Ok(IntentRow {
        intent_hash: parse_b256(T, &model.intent_hash)?,
        order_id: OrderedEventId(parse_fixed(T, &model.order_id)?),
        log_id: LogId(parse_fixed(T, &model.log_id)?),
        deposit_id: model.deposit_id as u64,
        verifier: parse_addr(T, &model.verifier)?,
        owner: parse_addr(T, &model.owner)?,
        to: parse_addr(T, &model.to_address)?,
        amount: parse_u256(T, &model.amount)?,
        currency: parse_b256(T, &model.currency)?,
        verifier_track_id: parse_b256(T, &model.verifier_track_id)?,
        currency_track_id: parse_b256(T, &model.currency_track_id)?,
        rate_version_id: RateVersionId(parse_fixed(T, &model.rate_version_id)?),
        state: IntentState::from_str(&model.state)
            .ok_or_else(|| corrupt(T, format!("bad state {}", model.state)))?,
        sustainability_fee: model
            .sustainability_fee
            .as_deref()
            .map(|s| parse_u256(T, s))
            .transpose()?,
        verifier_fee: model
            .verifier_fee
            .as_deref()
            .map(|s| parse_u256(T, s))
            .transpose()?,
        resolved_log_id: model
            .resolved_log_id
            .as_deref()
            .map(|s| parse_fixed(T, s).map(LogId))
            .transpose()?,
        transaction_id: parse_b256(T, &model.transaction_id)?,
        participant_id: parse_b256(T, &model.participant_id)?,
    })
}

fn stat_row_of(model: stat::Model) -> Result<StatRow, StoreError> {
    const T: &str = "stat";
    Ok(StatRow {
        id: StatBucketId(parse_fixed(T, &model.id)?),
        width: BucketWidth::from_str(&model.width)
            .ok_or_else(|| corrupt(T, format!("bad width {}", model.width)))?,
        bucket_start: model.bucket_start as u64,
        action: super::StatAction::from_str(&model.action)
            .ok_or_else(|| corrupt(T, format!("bad action {}", model.action)))?,
        token: parse_addr(T, &model.token)?,
        currency: model
            .currency
            .as_deref()
            .map(|s| parse_b256(T, s))
            .transpose()?,
        verifier: parse_addr(T, &model.verifier)?,
        amount: parse_i256(T, &model.amount)?,
    })
}

#[async_trait]
impl<C> LedgerStore for PgLedgerStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    async fn insert_block(&self, row: BlockRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if Block::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        block::ActiveModel {
            id: Set(id),
            chain_id: Set(row.chain_id as i64),
            number: Set(row.number as i64),
            timestamp: Set(row.timestamp as i64),
            hash: Set(row.hash.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn insert_transaction(&self, row: TransactionRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if Transaction::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        transaction::ActiveModel {
            id: Set(id),
            block_id: Set(row.block_id.to_string()),
            hash: Set(row.hash.to_string()),
            index: Set(row.index as i32),
            from_address: Set(row.from.to_string()),
            to_address: Set(row.to.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn insert_participant(&self, row: ParticipantRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if Participant::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        participant::ActiveModel {
            id: Set(id),
            chain_id: Set(row.chain_id as i64),
            address: Set(row.address.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn insert_action(&self, row: ActionRow) -> Result<bool, StoreError> {
        let id = row.id.to_hex();
        if Action::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        action::ActiveModel {
            id: Set(id),
            log_id: Set(row.log_id.to_hex()),
            participant_id: Set(row.participant_id.to_string()),
            transaction_id: Set(row.transaction_id.to_string()),
            deposit_id: Set(row.deposit_id as i64),
            event: Set(row.event.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn insert_deposit(&self, row: DepositRow) -> Result<bool, StoreError> {
        let id = row.deposit_id as i64;
        if Deposit::find_by_id(id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        deposit::ActiveModel {
            deposit_id: Set(id),
            order_id: Set(row.order_id.to_hex()),
            log_id: Set(row.log_id.to_hex()),
            transaction_id: Set(row.transaction_id.to_string()),
            token: Set(row.token.to_string()),
            participant_id: Set(row.participant_id.to_string()),
            deposited: Set(row.deposited.to_string()),
            remaining: Set(row.remaining.to_string()),
            min_amount: Set(row.min_amount.to_string()),
            max_amount: Set(row.max_amount.to_string()),
            status: Set(row.status.as_str().to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_deposit(&self, deposit_id: u64) -> Result<Option<DepositRow>, StoreError> {
        let model = Deposit::find_by_id(deposit_id as i64).one(&self.db).await?;
        model.map(deposit_row_of).transpose()
    }

    async fn update_deposit_balance(
        &self,
        deposit_id: u64,
        remaining: I256,
        status: DepositStatus,
    ) -> Result<(), StoreError> {
        let model = Deposit::find_by_id(deposit_id as i64)
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "deposit",
                key: deposit_id.to_string(),
            })?;
        let mut active_model = model.into_active_model();
        active_model.remaining = Set(remaining.to_string());
        active_model.status = Set(status.as_str().to_string());
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_deposit_delta(&self, row: DepositDeltaRow) -> Result<bool, StoreError> {
        let id = row.order_id.to_hex();
        if DepositDelta::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        deposit_delta::ActiveModel {
            order_id: Set(id),
            log_id: Set(row.log_id.to_hex()),
            deposit_id: Set(row.deposit_id as i64),
            amount_before: Set(row.amount_before.to_string()),
            delta: Set(row.delta.to_string()),
            amount_after: Set(row.amount_after.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn insert_verifier_track(&self, row: VerifierTrackRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if VerifierTrack::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        verifier_track::ActiveModel {
            id: Set(id),
            order_id: Set(row.order_id.to_hex()),
            log_id: Set(row.log_id.to_hex()),
            deposit_id: Set(row.deposit_id as i64),
            verifier: Set(row.verifier.to_string()),
            transaction_id: Set(row.transaction_id.to_string()),
            participant_id: Set(row.participant_id.to_string()),
            payee_details_hash: Set(row.payee_details_hash.to_string()),
            intent_gating_service: Set(row.intent_gating_service.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_verifier_track(&self, id: B256) -> Result<Option<VerifierTrackRow>, StoreError> {
        let model = VerifierTrack::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        model.map(verifier_track_row_of).transpose()
    }

    async fn insert_currency_track(&self, row: CurrencyTrackRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if CurrencyTrack::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        currency_track::ActiveModel {
            id: Set(id),
            order_id: Set(row.order_id.to_hex()),
            log_id: Set(row.log_id.to_hex()),
            deposit_id: Set(row.deposit_id as i64),
            verifier: Set(row.verifier.to_string()),
            currency: Set(row.currency.to_string()),
            verifier_track_id: Set(row.verifier_track_id.to_string()),
            current_rate_version_id: Set(row.current_rate_version_id.to_hex()),
            transaction_id: Set(row.transaction_id.to_string()),
            participant_id: Set(row.participant_id.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_currency_track(&self, id: B256) -> Result<Option<CurrencyTrackRow>, StoreError> {
        let model = CurrencyTrack::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        model.map(currency_track_row_of).transpose()
    }

    async fn repoint_currency_track(
        &self,
        id: B256,
        version: RateVersionId,
    ) -> Result<(), StoreError> {
        let model = CurrencyTrack::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "currency_track",
                key: id.to_string(),
            })?;
        let mut active_model = model.into_active_model();
        active_model.current_rate_version_id = Set(version.to_hex());
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_rate_version(&self, row: RateVersionRow) -> Result<bool, StoreError> {
        let id = row.id.to_hex();
        if RateVersion::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        rate_version::ActiveModel {
            id: Set(id),
            order_id: Set(row.order_id.to_hex()),
            log_id: Set(row.log_id.to_hex()),
            currency_track_id: Set(row.currency_track_id.to_string()),
            verifier_track_id: Set(row.verifier_track_id.to_string()),
            deposit_id: Set(row.deposit_id as i64),
            verifier: Set(row.verifier.to_string()),
            currency: Set(row.currency.to_string()),
            change_id: Set(row.change_id as i32),
            value: Set(row.value.to_string()),
            active: Set(row.active),
            transaction_id: Set(row.transaction_id.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_rate_version(
        &self,
        id: RateVersionId,
    ) -> Result<Option<RateVersionRow>, StoreError> {
        let model = RateVersion::find_by_id(id.to_hex()).one(&self.db).await?;
        model.map(rate_version_row_of).transpose()
    }

    async fn set_rate_version_active(
        &self,
        id: RateVersionId,
        active: bool,
    ) -> Result<(), StoreError> {
        let model = RateVersion::find_by_id(id.to_hex())
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "rate_version",
                key: id.to_hex(),
            })?;
        let mut active_model = model.into_active_model();
        active_model.active = Set(active);
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_intent(&self, row: IntentRow) -> Result<bool, StoreError> {
        let id = row.intent_hash.to_string();
        if Intent::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        intent::ActiveModel {
            intent_hash: Set(id),
            order_id: Set(row.order_id.to_hex()),
            log_id: Set(row.log_id.to_hex()),
            deposit_id: Set(row.deposit_id as i64),
            verifier: Set(row.verifier.to_string()),
            owner: Set(row.owner.to_string()),
            to_address: Set(row.to.to_string()),
            amount: Set(row.amount.to_string()),
            currency: Set(row.currency.to_string()),
            verifier_track_id: Set(row.verifier_track_id.to_string()),
            currency_track_id: Set(row.currency_track_id.to_string()),
            rate_version_id: Set(row.rate_version_id.to_hex()),
            state: Set(row.state.as_str().to_string()),
            sustainability_fee: Set(row.sustainability_fee.map(|v| v.to_string())),
            verifier_fee: Set(row.verifier_fee.map(|v| v.to_string())),
            resolved_log_id: Set(row.resolved_log_id.map(|v| v.to_hex())),
            transaction_id: Set(row.transaction_id.to_string()),
            participant_id: Set(row.participant_id.to_string()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_intent(&self, intent_hash: B256) -> Result<Option<IntentRow>, StoreError> {
        let model = Intent::find_by_id(intent_hash.to_string())
            .one(&self.db)
            .await?;
        model.map(intent_row_of).transpose()
    }

    async fn resolve_intent(
        &self,
        intent_hash: B256,
        resolution: IntentResolution,
    ) -> Result<(), StoreError> {
        let model = Intent::find_by_id(intent_hash.to_string())
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "intent",
                key: intent_hash.to_string(),
            })?;
        let mut active_model = model.into_active_model();
        match resolution {
            IntentResolution::Pruned { log_id } => {
                active_model.state = Set(IntentState::Pruned.as_str().to_string());
                active_model.resolved_log_id = Set(Some(log_id.to_hex()));
            }
            IntentResolution::Fulfilled {
                log_id,
                sustainability_fee,
                verifier_fee,
            } => {
                active_model.state = Set(IntentState::Fulfilled.as_str().to_string());
                active_model.resolved_log_id = Set(Some(log_id.to_hex()));
                active_model.sustainability_fee = Set(Some(sustainability_fee.to_string()));
                active_model.verifier_fee = Set(Some(verifier_fee.to_string()));
            }
        }
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_payment_verifier(&self, row: PaymentVerifierRow) -> Result<bool, StoreError> {
        let id = row.verifier.to_string();
        if PaymentVerifier::find_by_id(&id)
            .one(&self.db)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        payment_verifier::ActiveModel {
            verifier: Set(id),
            fee_share: Set(row.fee_share.to_string()),
            active: Set(row.active),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_payment_verifier(
        &self,
        verifier: Address,
    ) -> Result<Option<PaymentVerifierRow>, StoreError> {
        const T: &str = "payment_verifier";
        let model = PaymentVerifier::find_by_id(verifier.to_string())
            .one(&self.db)
            .await?;
        model
            .map(|m| {
                Ok(PaymentVerifierRow {
                    verifier: parse_addr(T, &m.verifier)?,
                    fee_share: parse_u256(T, &m.fee_share)?,
                    active: m.active,
                })
            })
            .transpose()
    }

    async fn set_payment_verifier_fee(
        &self,
        verifier: Address,
        fee_share: U256,
    ) -> Result<(), StoreError> {
        let model = PaymentVerifier::find_by_id(verifier.to_string())
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "payment_verifier",
                key: verifier.to_string(),
            })?;
        let mut active_model = model.into_active_model();
        active_model.fee_share = Set(fee_share.to_string());
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn set_payment_verifier_active(
        &self,
        verifier: Address,
        active: bool,
    ) -> Result<(), StoreError> {
        let model = PaymentVerifier::find_by_id(verifier.to_string())
            .one(&self.db)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: "payment_verifier",
                key: verifier.to_string(),
            })?;
        let mut active_model = model.into_active_model();
        active_model.active = Set(active);
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_payee_details(&self, row: PayeeDetailsRow) -> Result<bool, StoreError> {
        let id = row.id.to_string();
        if PayeeDetails::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        payee_details::ActiveModel {
            id: Set(id),
            intent_gating_service: Set(row.intent_gating_service.to_string()),
            payee_details: Set(hex_of(&row.payee_details)),
            data: Set(hex_of(&row.data)),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    async fn find_payee_details(&self, id: B256) -> Result<Option<PayeeDetailsRow>, StoreError> {
        const T: &str = "payee_details";
        let model = PayeeDetails::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        model
            .map(|m| {
                Ok(PayeeDetailsRow {
                    id: parse_b256(T, &m.id)?,
                    intent_gating_service: parse_addr(T, &m.intent_gating_service)?,
                    payee_details: parse_bytes(T, &m.payee_details)?,
                    data: parse_bytes(T, &m.data)?,
                })
            })
            .transpose()
    }

    async fn merge_stat(&self, row: StatRow) -> Result<I256, StoreError> {
        let id = row.id.to_hex();
        match Stat::find_by_id(&id).one(&self.db).await? {
            Some(existing) => {
                let current = parse_i256("stat", &existing.amount)?;
                let merged = current.checked_add(row.amount).ok_or_else(|| {
                    corrupt("stat", format!("counter overflow for {}", row.id))
                })?;
                let mut active_model = existing.into_active_model();
                active_model.amount = Set(merged.to_string());
                active_model.update(&self.db).await?;
                Ok(merged)
            }
            None => {
                let amount = row.amount;
                stat::ActiveModel {
                    id: Set(id),
                    width: Set(row.width.as_str().to_string()),
                    bucket_start: Set(row.bucket_start as i64),
                    action: Set(row.action.as_str().to_string()),
                    token: Set(row.token.to_string()),
                    currency: Set(row.currency.map(|c| c.to_string())),
                    verifier: Set(row.verifier.to_string()),
                    amount: Set(amount.to_string()),
                }
                .insert(&self.db)
                .await?;
                Ok(amount)
            }
        }
    }

    async fn find_stat(&self, id: StatBucketId) -> Result<Option<StatRow>, StoreError> {
        let model = Stat::find_by_id(id.to_hex()).one(&self.db).await?;
        model.map(stat_row_of).transpose()
    }

    async fn insert_applied_event(&self, key: &[u8]) -> Result<bool, StoreError> {
        let id = hex_of(key);
        if AppliedEvent::find_by_id(&id).one(&self.db).await?.is_some() {
            return Ok(false);
        }
        applied_event::ActiveModel { id: Set(id) }.insert(&self.db).await?;
        Ok(true)
    }

    async fn applied_event_seen(&self, key: &[u8]) -> Result<bool, StoreError> {
        let id = hex_of(key);
        Ok(AppliedEvent::find_by_id(&id).one(&self.db).await?.is_some())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let txn = self.db.begin().await?;
        Ok(Box::new(PgLedgerStore { db: txn }))
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerStore<DatabaseTransaction> {
    fn as_store(&self) -> &dyn LedgerStore {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.db.commit().await?;
        Ok(())
    }
}

fn parse_bytes(table: &'static str, s: &str) -> Result<alloy::primitives::Bytes, StoreError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped)
        .map(Into::into)
        .map_err(|e| corrupt(table, format!("bad hex {}: {}", s, e)))
}
