//! In-memory ledger store
//!
//! Backs the test suite and dry runs. Same conditional-write semantics as
//! the Postgres store, over locked maps. The unit of work is a snapshot:
//! `begin` clones the tables, writes land in the clone, `commit` swaps the
//! clone back into the parent. Single writer assumed, as everywhere in the
//! engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, B256, I256, U256};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::ids::{RateVersionId, StatBucketId};
use crate::lifecycle::DepositStatus;

use super::{
    ActionRow, BlockRow, CurrencyTrackRow, DepositDeltaRow, DepositRow, IntentResolution,
    IntentRow, IntentState, LedgerStore, LedgerTransaction, ParticipantRow, PayeeDetailsRow,
    PaymentVerifierRow, RateVersionRow, StatRow, TransactionRow, VerifierTrackRow,
};

#[derive(Default, Clone)]
struct Tables {
    blocks: HashMap<B256, BlockRow>,
    transactions: HashMap<B256, TransactionRow>,
    participants: HashMap<B256, ParticipantRow>,
    actions: BTreeMap<[u8; 21], ActionRow>,
    deposits: HashMap<u64, DepositRow>,
    deposit_deltas: BTreeMap<[u8; 21], DepositDeltaRow>,
    verifier_tracks: HashMap<B256, VerifierTrackRow>,
    currency_tracks: HashMap<B256, CurrencyTrackRow>,
    rate_versions: BTreeMap<[u8; 36], RateVersionRow>,
    intents: HashMap<B256, IntentRow>,
    payment_verifiers: HashMap<Address, PaymentVerifierRow>,
    payee_details: HashMap<B256, PayeeDetailsRow>,
    stats: HashMap<StatBucketId, StatRow>,
    applied_events: HashSet<Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
    parent: Option<Arc<RwLock<Tables>>>,
    fail_next_delta: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure on the next `insert_deposit_delta`, standing in
    /// for a connection dropped between two writes of the same event.
    pub fn fail_next_delta_insert(&self) {
        self.fail_next_delta.store(true, Ordering::SeqCst);
    }

    /// All versions of one currency track, in change-id order. Test helper;
    /// the engine itself only ever follows the current-version pointer.
    pub fn rate_versions_of(&self, currency_track: B256) -> Vec<RateVersionRow> {
        self.tables
            .read()
            .rate_versions
            .values()
            .filter(|v| v.currency_track_id == currency_track)
            .cloned()
            .collect()
    }

    pub fn deltas_of(&self, deposit_id: u64) -> Vec<DepositDeltaRow> {
        self.tables
            .read()
            .deposit_deltas
            .values()
            .filter(|d| d.deposit_id == deposit_id)
            .cloned()
            .collect()
    }

    pub fn action_count(&self) -> usize {
        self.tables.read().actions.len()
    }
}

fn insert_if_absent<K: std::hash::Hash + Eq, V>(map: &mut HashMap<K, V>, key: K, row: V) -> bool {
    if map.contains_key(&key) {
        return false;
    }
    map.insert(key, row);
    true
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_block(&self, row: BlockRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(&mut self.tables.write().blocks, row.id, row))
    }

    async fn insert_transaction(&self, row: TransactionRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().transactions,
            row.id,
            row,
        ))
    }

    async fn insert_participant(&self, row: ParticipantRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().participants,
            row.id,
            row,
        ))
    }

    async fn insert_action(&self, row: ActionRow) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if tables.actions.contains_key(&row.id.0) {
            return Ok(false);
        }
        tables.actions.insert(row.id.0, row);
        Ok(true)
    }

    async fn insert_deposit(&self, row: DepositRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().deposits,
            row.deposit_id,
            row,
        ))
    }

    async fn find_deposit(&self, deposit_id: u64) -> Result<Option<DepositRow>, StoreError> {
        Ok(self.tables.read().deposits.get(&deposit_id).cloned())
    }

    async fn update_deposit_balance(
        &self,
        deposit_id: u64,
        remaining: I256,
        status: DepositStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .deposits
            .get_mut(&deposit_id)
            .ok_or(StoreError::RowNotFound {
                table: "deposit",
                key: deposit_id.to_string(),
            })?;
        row.remaining = remaining;
        row.status = status;
        Ok(())
    }

    async fn insert_deposit_delta(&self, row: DepositDeltaRow) -> Result<bool, StoreError> {
        if self.fail_next_delta.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Db(sea_orm::DbErr::Custom(
                "simulated connection loss".into(),
            )));
        }
        let mut tables = self.tables.write();
        if tables.deposit_deltas.contains_key(&row.order_id.0) {
            return Ok(false);
        }
        tables.deposit_deltas.insert(row.order_id.0, row);
        Ok(true)
    }

    async fn insert_verifier_track(&self, row: VerifierTrackRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().verifier_tracks,
            row.id,
            row,
        ))
    }

    async fn find_verifier_track(&self, id: B256) -> Result<Option<VerifierTrackRow>, StoreError> {
        Ok(self.tables.read().verifier_tracks.get(&id).cloned())
    }

    async fn insert_currency_track(&self, row: CurrencyTrackRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().currency_tracks,
            row.id,
            row,
        ))
    }

    async fn find_currency_track(&self, id: B256) -> Result<Option<CurrencyTrackRow>, StoreError> {
        Ok(self.tables.read().currency_tracks.get(&id).cloned())
    }

    async fn repoint_currency_track(
        &self,
        id: B256,
        version: RateVersionId,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .currency_tracks
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                table: "currency_track",
                key: id.to_string(),
            })?;
        row.current_rate_version_id = version;
        Ok(())
    }

    async fn insert_rate_version(&self, row: RateVersionRow) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if tables.rate_versions.contains_key(&row.id.0) {
            return Ok(false);
        }
        tables.rate_versions.insert(row.id.0, row);
        Ok(true)
    }

    async fn find_rate_version(
        &self,
        id: RateVersionId,
    ) -> Result<Option<RateVersionRow>, StoreError> {
        Ok(self.tables.read().rate_versions.get(&id.0).cloned())
    }

    async fn set_rate_version_active(
        &self,
        id: RateVersionId,
        active: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .rate_versions
            .get_mut(&id.0)
            .ok_or(StoreError::RowNotFound {
                table: "rate_version",
                key: id.to_string(),
            })?;
        row.active = active;
        Ok(())
    }

    async fn insert_intent(&self, row: IntentRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().intents,
            row.intent_hash,
            row,
        ))
    }

    async fn find_intent(&self, intent_hash: B256) -> Result<Option<IntentRow>, StoreError> {
        Ok(self.tables.read().intents.get(&intent_hash).cloned())
    }

    async fn resolve_intent(
        &self,
        intent_hash: B256,
        resolution: IntentResolution,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .intents
            .get_mut(&intent_hash)
            .ok_or(StoreError::RowNotFound {
                table: "intent",
                key: intent_hash.to_string(),
            })?;
        match resolution {
            IntentResolution::Pruned { log_id } => {
                row.state = IntentState::Pruned;
                row.resolved_log_id = Some(log_id);
            }
            IntentResolution::Fulfilled {
                log_id,
                sustainability_fee,
                verifier_fee,
            } => {
                row.state = IntentState::Fulfilled;
                row.resolved_log_id = Some(log_id);
                row.sustainability_fee = Some(sustainability_fee);
                row.verifier_fee = Some(verifier_fee);
            }
        }
        Ok(())
    }

    async fn insert_payment_verifier(&self, row: PaymentVerifierRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().payment_verifiers,
            row.verifier,
            row,
        ))
    }

    async fn find_payment_verifier(
        &self,
        verifier: Address,
    ) -> Result<Option<PaymentVerifierRow>, StoreError> {
        Ok(self.tables.read().payment_verifiers.get(&verifier).cloned())
    }

    async fn set_payment_verifier_fee(
        &self,
        verifier: Address,
        fee_share: U256,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .payment_verifiers
            .get_mut(&verifier)
            .ok_or(StoreError::RowNotFound {
                table: "payment_verifier",
                key: verifier.to_string(),
            })?;
        row.fee_share = fee_share;
        Ok(())
    }

    async fn set_payment_verifier_active(
        &self,
        verifier: Address,
        active: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .payment_verifiers
            .get_mut(&verifier)
            .ok_or(StoreError::RowNotFound {
                table: "payment_verifier",
                key: verifier.to_string(),
            })?;
        row.active = active;
        Ok(())
    }

    async fn insert_payee_details(&self, row: PayeeDetailsRow) -> Result<bool, StoreError> {
        Ok(insert_if_absent(
            &mut self.tables.write().payee_details,
            row.id,
            row,
        ))
    }

    async fn find_payee_details(&self, id: B256) -> Result<Option<PayeeDetailsRow>, StoreError> {
        Ok(self.tables.read().payee_details.get(&id).cloned())
    }

    async fn merge_stat(&self, row: StatRow) -> Result<I256, StoreError> {
        let mut tables = self.tables.write();
        match tables.stats.get_mut(&row.id) {
            Some(existing) => {
                existing.amount =
                    existing
                        .amount
                        .checked_add(row.amount)
                        .ok_or(StoreError::Corrupt {
                            table: "stat",
                            detail: format!("counter overflow for {}", row.id),
                        })?;
                Ok(existing.amount)
            }
            None => {
                let amount = row.amount;
                tables.stats.insert(row.id, row);
                Ok(amount)
            }
        }
    }

    async fn find_stat(&self, id: StatBucketId) -> Result<Option<StatRow>, StoreError> {
        Ok(self.tables.read().stats.get(&id).cloned())
    }

    async fn insert_applied_event(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.tables.write().applied_events.insert(key.to_vec()))
    }

    async fn applied_event_seen(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.tables.read().applied_events.contains(key))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let snapshot = self.tables.read().clone();
        Ok(Box::new(MemoryLedgerStore {
            tables: Arc::new(RwLock::new(snapshot)),
            parent: Some(self.tables.clone()),
            fail_next_delta: self.fail_next_delta.clone(),
        }))
    }
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerStore {
    fn as_store(&self) -> &dyn LedgerStore {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if let Some(parent) = &self.parent {
            *parent.write() = self.tables.read().clone();
        }
        Ok(())
    }
}
