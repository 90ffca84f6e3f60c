//! Ledger store adapter
//!
//! The materialization engine is the sole mutator of every row defined here
//! and reaches persistence only through [`LedgerStore`]. Insert methods are
//! insert-if-absent and report whether the row was actually written, so
//! replayed events resolve to "first write wins". Update methods are
//! conditional on the row existing and fail with `RowNotFound` otherwise.
//!
//! One event's effects are applied inside a [`LedgerTransaction`]: nothing
//! becomes visible until `commit`, and a transaction dropped mid-way
//! publishes nothing, so a store failure between two writes leaves the
//! event un-applied as a whole.

pub mod memory;
pub mod pg;

use alloy::primitives::{Address, Bytes, B256, I256, U256};
use async_trait::async_trait;

use crate::error::StoreError;
use crate::ids::{BucketWidth, LogId, OrderedEventId, RateVersionId, StatBucketId};
use crate::lifecycle::DepositStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRow {
    pub id: B256,
    pub chain_id: u64,
    pub number: u64,
    pub timestamp: u64,
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    pub id: B256,
    pub block_id: B256,
    pub hash: B256,
    pub index: u32,
    pub from: Address,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub id: B256,
    pub chain_id: u64,
    pub address: Address,
}

/// Journal row linking a log entry, a participant, a transaction and a
/// deposit: the backbone tracing who did what, to which deposit, where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    pub id: OrderedEventId,
    pub log_id: LogId,
    pub participant_id: B256,
    pub transaction_id: B256,
    pub deposit_id: u64,
    pub event: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRow {
    pub deposit_id: u64,
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub transaction_id: B256,
    pub token: Address,
    pub participant_id: B256,
    /// Original funded amount; immutable.
    pub deposited: U256,
    /// Running balance. Signed so an anomalous negative value can be
    /// recorded as-is instead of clamped.
    pub remaining: I256,
    pub min_amount: U256,
    pub max_amount: U256,
    pub status: DepositStatus,
}

/// Audit row written for every balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositDeltaRow {
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub deposit_id: u64,
    pub amount_before: I256,
    pub delta: I256,
    pub amount_after: I256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierTrackRow {
    pub id: B256,
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub deposit_id: u64,
    pub verifier: Address,
    pub transaction_id: B256,
    pub participant_id: B256,
    pub payee_details_hash: B256,
    pub intent_gating_service: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyTrackRow {
    pub id: B256,
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    pub verifier_track_id: B256,
    /// Pointer to the active rate version; the only mutable field.
    pub current_rate_version_id: RateVersionId,
    pub transaction_id: B256,
    pub participant_id: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateVersionRow {
    pub id: RateVersionId,
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub currency_track_id: B256,
    pub verifier_track_id: B256,
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    /// Gapless per track, starting at 0.
    pub change_id: u32,
    pub value: U256,
    /// True only for the most recent version of the track.
    pub active: bool,
    pub transaction_id: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentState {
    Signaled,
    Pruned,
    Fulfilled,
}

impl IntentState {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentState::Signaled => "signaled",
            IntentState::Pruned => "pruned",
            IntentState::Fulfilled => "fulfilled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "signaled" => Some(IntentState::Signaled),
            "pruned" => Some(IntentState::Pruned),
            "fulfilled" => Some(IntentState::Fulfilled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRow {
    pub intent_hash: B256,
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub deposit_id: u64,
    pub verifier: Address,
    pub owner: Address,
    pub to: Address,
    pub amount: U256,
    pub currency: B256,
    pub verifier_track_id: B256,
    pub currency_track_id: B256,
    /// Rate version active at signal time. Frozen: never rewritten by later
    /// rate updates.
    pub rate_version_id: RateVersionId,
    pub state: IntentState,
    pub sustainability_fee: Option<U256>,
    pub verifier_fee: Option<U256>,
    pub resolved_log_id: Option<LogId>,
    pub transaction_id: B256,
    pub participant_id: B256,
}

/// How an in-flight intent left the signaled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentResolution {
    Pruned {
        log_id: LogId,
    },
    Fulfilled {
        log_id: LogId,
        sustainability_fee: U256,
        verifier_fee: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerifierRow {
    pub verifier: Address,
    pub fee_share: U256,
    pub active: bool,
}

/// Off-chain payee configuration, cached by its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayeeDetailsRow {
    pub id: B256,
    pub intent_gating_service: Address,
    pub payee_details: Bytes,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatAction {
    Deposit,
    Withdrawal,
    Exchange,
}

impl StatAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StatAction::Deposit => "deposit",
            StatAction::Withdrawal => "withdrawal",
            StatAction::Exchange => "exchange",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(StatAction::Deposit),
            "withdrawal" => Some(StatAction::Withdrawal),
            "exchange" => Some(StatAction::Exchange),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub id: StatBucketId,
    pub width: BucketWidth,
    pub bucket_start: u64,
    pub action: StatAction,
    pub token: Address,
    pub currency: Option<B256>,
    pub verifier: Address,
    pub amount: I256,
}

/// Store adapter: point lookups, insert-if-absent, conditional updates and
/// merge upserts over the materialized tables.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_block(&self, row: BlockRow) -> Result<bool, StoreError>;
    async fn insert_transaction(&self, row: TransactionRow) -> Result<bool, StoreError>;
    async fn insert_participant(&self, row: ParticipantRow) -> Result<bool, StoreError>;
    async fn insert_action(&self, row: ActionRow) -> Result<bool, StoreError>;

    async fn insert_deposit(&self, row: DepositRow) -> Result<bool, StoreError>;
    async fn find_deposit(&self, deposit_id: u64) -> Result<Option<DepositRow>, StoreError>;
    /// Write the post-mutation balance and its derived status in one step.
    async fn update_deposit_balance(
        &self,
        deposit_id: u64,
        remaining: I256,
        status: DepositStatus,
    ) -> Result<(), StoreError>;
    async fn insert_deposit_delta(&self, row: DepositDeltaRow) -> Result<bool, StoreError>;

    async fn insert_verifier_track(&self, row: VerifierTrackRow) -> Result<bool, StoreError>;
    async fn find_verifier_track(&self, id: B256) -> Result<Option<VerifierTrackRow>, StoreError>;
    async fn insert_currency_track(&self, row: CurrencyTrackRow) -> Result<bool, StoreError>;
    async fn find_currency_track(&self, id: B256) -> Result<Option<CurrencyTrackRow>, StoreError>;
    /// Repoint a currency track's "current version" pointer.
    async fn repoint_currency_track(
        &self,
        id: B256,
        version: RateVersionId,
    ) -> Result<(), StoreError>;
    async fn insert_rate_version(&self, row: RateVersionRow) -> Result<bool, StoreError>;
    async fn find_rate_version(
        &self,
        id: RateVersionId,
    ) -> Result<Option<RateVersionRow>, StoreError>;
    async fn set_rate_version_active(
        &self,
        id: RateVersionId,
        active: bool,
    ) -> Result<(), StoreError>;

    async fn insert_intent(&self, row: IntentRow) -> Result<bool, StoreError>;
    async fn find_intent(&self, intent_hash: B256) -> Result<Option<IntentRow>, StoreError>;
    async fn resolve_intent(
        &self,
        intent_hash: B256,
        resolution: IntentResolution,
    ) -> Result<(), StoreError>;

    async fn insert_payment_verifier(&self, row: PaymentVerifierRow) -> Result<bool, StoreError>;
    async fn find_payment_verifier(
        &self,
        verifier: Address,
    ) -> Result<Option<PaymentVerifierRow>, StoreError>;
    async fn set_payment_verifier_fee(
        &self,
        verifier: Address,
        fee_share: U256,
    ) -> Result<(), StoreError>;
    async fn set_payment_verifier_active(
        &self,
        verifier: Address,
        active: bool,
    ) -> Result<(), StoreError>;

    async fn insert_payee_details(&self, row: PayeeDetailsRow) -> Result<bool, StoreError>;
    async fn find_payee_details(&self, id: B256) -> Result<Option<PayeeDetailsRow>, StoreError>;

    /// Upsert-with-merge: insert the row if absent, otherwise add its
    /// `amount` to the existing counter. Returns the post-merge value.
    async fn merge_stat(&self, row: StatRow) -> Result<I256, StoreError>;
    async fn find_stat(&self, id: StatBucketId) -> Result<Option<StatRow>, StoreError>;

    /// Idempotency ledger: returns true only the first time a key is seen.
    async fn insert_applied_event(&self, key: &[u8]) -> Result<bool, StoreError>;
    async fn applied_event_seen(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Open the unit of work covering one event's effects.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;
}

/// An open unit of work. All writes go through the [`LedgerStore`] view;
/// nothing is published until `commit`, and dropping the transaction
/// without committing discards every write in it.
#[async_trait]
pub trait LedgerTransaction: LedgerStore {
    fn as_store(&self) -> &dyn LedgerStore;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
