//! Event dispatcher
//!
//! Integration surface with the chain-log source: one decoded event at a
//! time, in chain order. Each event is applied all-or-nothing inside one
//! store transaction: provenance rows first (independent, written
//! concurrently), then the kind-specific effects, then the
//! idempotency-ledger mark, then commit. A failure anywhere before commit
//! rolls the whole event back and leaves it unmarked, so a redelivery
//! retries it from scratch; a replay of an already-applied event is skipped
//! entirely, which keeps the additive stat counters from double-counting.

use std::sync::Arc;

use alloy::primitives::{Address, I256, U256};
use tokio::sync::mpsc;

use crate::error::{IndexerError, StoreError};
use crate::events::{
    ChainEvent, ConversionRateUpdated, DepositClosed, DepositCurrencyAdded, DepositReceived,
    DepositVerifierAdded, DepositWithdrawn, EscrowEvent, EventMeta, IntentFulfilled, IntentPruned,
    IntentSignaled, PaymentVerifierAdded, PaymentVerifierFeeUpdated, PaymentVerifierRemoved,
};
use crate::ids::{self, LogId, OrderedEventId};
use crate::lifecycle::{next_status, DepositSnapshot, DepositStatus, LifecycleAction};
use crate::payee::PayeeReader;
use crate::rates::{self, OpenTrack, RateUpdate};
use crate::stats;
use crate::store::{
    ActionRow, BlockRow, DepositDeltaRow, DepositRow, IntentResolution, IntentRow, IntentState,
    LedgerStore, ParticipantRow, PayeeDetailsRow, PaymentVerifierRow, StatAction, TransactionRow,
    VerifierTrackRow,
};

pub struct Dispatcher {
    store: Arc<dyn LedgerStore>,
    payees: Arc<dyn PayeeReader>,
    min_viable_unit: U256,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        payees: Arc<dyn PayeeReader>,
        min_viable_unit: U256,
    ) -> Self {
        Self {
            store,
            payees,
            min_viable_unit,
        }
    }

    /// Consume the inbound feed until it closes. Integrity violations halt
    /// the loop; the surrounding application is expected to alert.
    pub async fn run(&self, mut feed: mpsc::Receiver<ChainEvent>) -> Result<(), IndexerError> {
        while let Some(event) = feed.recv().await {
            if let Err(e) = self.apply(&event).await {
                tracing::error!("[dispatcher] failed to apply {}: {}", event.body.name(), e);
                return Err(e);
            }
        }
        tracing::info!("[dispatcher] event feed closed");
        Ok(())
    }

    /// Apply one event's effects inside a single unit of work.
    pub async fn apply(&self, event: &ChainEvent) -> Result<(), IndexerError> {
        let meta = &event.meta;
        let log_id = ids::log_id(
            meta.block_timestamp,
            meta.tx_index,
            meta.log_index,
            meta.chain_id,
        );
        let ordered_id = event.body.ordered_kind().map(|kind| {
            ids::ordered_event_id(
                meta.block_timestamp,
                meta.tx_index,
                kind,
                meta.log_index,
                meta.chain_id,
            )
        });
        let applied_key: Vec<u8> = match ordered_id {
            Some(id) => id.0.to_vec(),
            None => log_id.0.to_vec(),
        };

        if self.store.applied_event_seen(&applied_key).await? {
            tracing::debug!(
                "[dispatcher] replayed {} at {} already applied, skipping",
                event.body.name(),
                log_id
            );
            return Ok(());
        }

        // Everything below lands in one transaction. An error path drops it
        // uncommitted, so a partially-applied event publishes nothing.
        let txn = self.store.begin().await?;
        let store = txn.as_store();

        // Provenance rows have no data dependency on each other.
        let (block, transaction, participant) = tokio::join!(
            store.insert_block(block_row(meta)),
            store.insert_transaction(transaction_row(meta)),
            store.insert_participant(participant_row(meta.chain_id, meta.tx_from)),
        );
        block?;
        transaction?;
        participant?;

        match &event.body {
            EscrowEvent::DepositReceived(args) => {
                self.on_deposit_received(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::DepositWithdrawn(args) => {
                self.on_deposit_withdrawn(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::DepositClosed(args) => {
                self.on_deposit_closed(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::DepositVerifierAdded(args) => {
                self.on_verifier_added(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::DepositCurrencyAdded(args) => {
                self.on_currency_added(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::ConversionRateUpdated(args) => {
                self.on_rate_updated(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::IntentSignaled(args) => {
                self.on_intent_signaled(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::IntentPruned(args) => {
                self.on_intent_pruned(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::IntentFulfilled(args) => {
                self.on_intent_fulfilled(store, meta, args, log_id, ordered_id)
                    .await?
            }
            EscrowEvent::PaymentVerifierAdded(args) => {
                self.on_payment_verifier_added(store, args).await?
            }
            EscrowEvent::PaymentVerifierFeeUpdated(args) => {
                self.on_payment_verifier_fee_updated(store, args, ordered_id)
                    .await?
            }
            EscrowEvent::PaymentVerifierRemoved(args) => {
                self.on_payment_verifier_removed(store, args, ordered_id)
                    .await?
            }
        }

        store.insert_applied_event(&applied_key).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn on_deposit_received(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &DepositReceived,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        let owner_id = ids::participant_id(meta.chain_id, args.depositor);
        store
            .insert_participant(participant_row(meta.chain_id, args.depositor))
            .await?;

        match store.find_deposit(args.deposit_id).await? {
            Some(_) => {
                // Same deposit id from a different log: the contract assigns
                // ids monotonically, so this is upstream duplication. First
                // write wins; the phantom amount stays out of the counters.
                tracing::warn!(
                    "[deposit {}] duplicate DepositReceived at {}, keeping existing row",
                    args.deposit_id,
                    log_id
                );
            }
            None => {
                let remaining = signed(args.amount);
                let status = next_status(
                    LifecycleAction::Deposit,
                    &DepositSnapshot {
                        remaining,
                        min_amount: args.min_amount,
                        status: DepositStatus::Active,
                    },
                    self.min_viable_unit,
                );
                store
                    .insert_deposit(DepositRow {
                        deposit_id: args.deposit_id,
                        order_id,
                        log_id,
                        transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
                        token: args.token,
                        participant_id: owner_id,
                        deposited: args.amount,
                        remaining,
                        min_amount: args.min_amount,
                        max_amount: args.max_amount,
                        status,
                    })
                    .await?;
                store
                    .insert_deposit_delta(DepositDeltaRow {
                        order_id,
                        log_id,
                        deposit_id: args.deposit_id,
                        amount_before: I256::ZERO,
                        delta: remaining,
                        amount_after: remaining,
                    })
                    .await?;
                stats::record(
                    store,
                    meta.block_timestamp,
                    StatAction::Deposit,
                    args.token,
                    None,
                    Address::ZERO,
                    args.amount,
                )
                .await?;
            }
        }

        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "DepositReceived")
            .await
    }

    async fn on_deposit_withdrawn(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &DepositWithdrawn,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        let deposit = store.find_deposit(args.deposit_id).await?.ok_or_else(|| {
            IndexerError::integrity(
                "DepositWithdrawn",
                ordered_id,
                format!("withdrawal from unknown deposit {}", args.deposit_id),
            )
        })?;

        let before = deposit.remaining;
        let after = sub_balance(before, args.amount, "DepositWithdrawn", ordered_id)?;
        // A withdrawal that empties the deposit is a revocation; a partial
        // one leaves the deposit open and only re-evaluates its funding.
        let action = if after <= I256::ZERO {
            LifecycleAction::Withdraw
        } else {
            LifecycleAction::Exchange
        };
        let status = next_status(
            action,
            &DepositSnapshot {
                remaining: after,
                min_amount: deposit.min_amount,
                status: deposit.status,
            },
            self.min_viable_unit,
        );
        check_balance(args.deposit_id, after, deposit.deposited, "DepositWithdrawn");

        store
            .update_deposit_balance(args.deposit_id, after, status)
            .await?;
        store
            .insert_deposit_delta(DepositDeltaRow {
                order_id,
                log_id,
                deposit_id: args.deposit_id,
                amount_before: before,
                delta: -signed(args.amount),
                amount_after: after,
            })
            .await?;
        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "DepositWithdrawn")
            .await?;
        stats::record(
            store,
            meta.block_timestamp,
            StatAction::Withdrawal,
            deposit.token,
            None,
            Address::ZERO,
            args.amount,
        )
        .await
    }

    async fn on_deposit_closed(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &DepositClosed,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        let deposit = store.find_deposit(args.deposit_id).await?.ok_or_else(|| {
            IndexerError::integrity(
                "DepositClosed",
                ordered_id,
                format!("close of unknown deposit {}", args.deposit_id),
            )
        })?;

        let status = next_status(
            LifecycleAction::Close,
            &DepositSnapshot {
                remaining: deposit.remaining,
                min_amount: deposit.min_amount,
                status: deposit.status,
            },
            self.min_viable_unit,
        );
        store
            .update_deposit_balance(args.deposit_id, deposit.remaining, status)
            .await?;
        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "DepositClosed")
            .await
    }

    async fn on_verifier_added(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &DepositVerifierAdded,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        if store.find_deposit(args.deposit_id).await?.is_none() {
            return Err(IndexerError::integrity(
                "DepositVerifierAdded",
                ordered_id,
                format!("verifier added to unknown deposit {}", args.deposit_id),
            ));
        }

        let track_id = ids::verifier_track_id(meta.chain_id, args.verifier, args.deposit_id);
        store
            .insert_verifier_track(VerifierTrackRow {
                id: track_id,
                order_id,
                log_id,
                deposit_id: args.deposit_id,
                verifier: args.verifier,
                transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
                participant_id: ids::participant_id(meta.chain_id, meta.tx_from),
                payee_details_hash: args.payee_details_hash,
                intent_gating_service: args.intent_gating_service,
            })
            .await?;

        // Payee configuration lives off-chain; fetch and cache it on first
        // sight of its hash. A miss is recorded, not fatal.
        if store
            .find_payee_details(args.payee_details_hash)
            .await?
            .is_none()
        {
            match self.payees.payee_config(args.deposit_id, args.verifier).await {
                Ok(config) => {
                    store
                        .insert_payee_details(PayeeDetailsRow {
                            id: args.payee_details_hash,
                            intent_gating_service: config.intent_gating_service,
                            payee_details: config.payee_details,
                            data: config.data,
                        })
                        .await?;
                }
                Err(e) => {
                    tracing::warn!(
                        "[deposit {}] payee config {} unavailable: {}",
                        args.deposit_id,
                        args.payee_details_hash,
                        e
                    );
                }
            }
        }

        self.insert_action(
            store,
            meta,
            order_id,
            log_id,
            args.deposit_id,
            "DepositVerifierAdded",
        )
        .await
    }

    async fn on_currency_added(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &DepositCurrencyAdded,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        let verifier_track_id =
            ids::verifier_track_id(meta.chain_id, args.verifier, args.deposit_id);
        if store.find_verifier_track(verifier_track_id).await?.is_none() {
            return Err(IndexerError::integrity(
                "DepositCurrencyAdded",
                ordered_id,
                format!(
                    "currency added before verifier {} on deposit {}",
                    args.verifier, args.deposit_id
                ),
            ));
        }

        rates::open_track(
            store,
            OpenTrack {
                order_id,
                log_id,
                deposit_id: args.deposit_id,
                verifier: args.verifier,
                currency: args.currency,
                initial_rate: args.conversion_rate,
                verifier_track_id,
                transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
                participant_id: ids::participant_id(meta.chain_id, meta.tx_from),
            },
        )
        .await?;
        self.insert_action(
            store,
            meta,
            order_id,
            log_id,
            args.deposit_id,
            "DepositCurrencyAdded",
        )
        .await
    }

    async fn on_rate_updated(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &ConversionRateUpdated,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        rates::update_rate(
            store,
            RateUpdate {
                order_id,
                log_id,
                chain_id: meta.chain_id,
                deposit_id: args.deposit_id,
                verifier: args.verifier,
                currency: args.currency,
                new_rate: args.new_conversion_rate,
                transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
            },
        )
        .await?;
        self.insert_action(
            store,
            meta,
            order_id,
            log_id,
            args.deposit_id,
            "DepositConversionRateUpdated",
        )
        .await
    }

    async fn on_intent_signaled(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &IntentSignaled,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        let verifier_track_id =
            ids::verifier_track_id(meta.chain_id, args.verifier, args.deposit_id);
        let currency_track_id = ids::currency_track_id(verifier_track_id, args.currency);
        let track = store
            .find_currency_track(currency_track_id)
            .await?
            .ok_or_else(|| {
                IndexerError::integrity(
                    "IntentSignaled",
                    ordered_id,
                    format!(
                        "intent against unopened track {} (deposit {})",
                        currency_track_id, args.deposit_id
                    ),
                )
            })?;

        store
            .insert_participant(participant_row(meta.chain_id, args.owner))
            .await?;
        let inserted = store
            .insert_intent(IntentRow {
                intent_hash: args.intent_hash,
                order_id,
                log_id,
                deposit_id: args.deposit_id,
                verifier: args.verifier,
                owner: args.owner,
                to: args.to,
                amount: args.amount,
                currency: args.currency,
                verifier_track_id,
                currency_track_id,
                // Frozen reference: the version active right now, by id.
                rate_version_id: track.current_rate_version_id,
                state: IntentState::Signaled,
                sustainability_fee: None,
                verifier_fee: None,
                resolved_log_id: None,
                transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
                participant_id: ids::participant_id(meta.chain_id, args.owner),
            })
            .await?;
        if !inserted {
            tracing::warn!(
                "[intent {}] duplicate IntentSignaled at {}, keeping existing row",
                args.intent_hash,
                log_id
            );
        }
        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "IntentSignaled")
            .await
    }

    async fn on_intent_pruned(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &IntentPruned,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        if store.find_intent(args.intent_hash).await?.is_none() {
            return Err(IndexerError::integrity(
                "IntentPruned",
                ordered_id,
                format!("prune of unsignaled intent {}", args.intent_hash),
            ));
        }
        store
            .resolve_intent(args.intent_hash, IntentResolution::Pruned { log_id })
            .await?;
        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "IntentPruned")
            .await
    }

    async fn on_intent_fulfilled(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        args: &IntentFulfilled,
        log_id: LogId,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        let order_id = expect_ordered(ordered_id);
        if store.find_intent(args.intent_hash).await?.is_none() {
            return Err(IndexerError::integrity(
                "IntentFulfilled",
                ordered_id,
                format!("fulfillment of unsignaled intent {}", args.intent_hash),
            ));
        }
        let deposit = store.find_deposit(args.deposit_id).await?.ok_or_else(|| {
            IndexerError::integrity(
                "IntentFulfilled",
                ordered_id,
                format!("fulfillment against unknown deposit {}", args.deposit_id),
            )
        })?;

        let before = deposit.remaining;
        let after = sub_balance(before, args.amount, "IntentFulfilled", ordered_id)?;
        let status = next_status(
            LifecycleAction::Exchange,
            &DepositSnapshot {
                remaining: after,
                min_amount: deposit.min_amount,
                status: deposit.status,
            },
            self.min_viable_unit,
        );
        check_balance(args.deposit_id, after, deposit.deposited, "IntentFulfilled");

        store
            .update_deposit_balance(args.deposit_id, after, status)
            .await?;
        store
            .insert_deposit_delta(DepositDeltaRow {
                order_id,
                log_id,
                deposit_id: args.deposit_id,
                amount_before: before,
                delta: -signed(args.amount),
                amount_after: after,
            })
            .await?;
        store
            .resolve_intent(
                args.intent_hash,
                IntentResolution::Fulfilled {
                    log_id,
                    sustainability_fee: args.sustainability_fee,
                    verifier_fee: args.verifier_fee,
                },
            )
            .await?;
        self.insert_action(store, meta, order_id, log_id, args.deposit_id, "IntentFulfilled")
            .await?;
        stats::record(
            store,
            meta.block_timestamp,
            StatAction::Exchange,
            deposit.token,
            Some(args.currency),
            args.verifier,
            args.amount,
        )
        .await
    }

    async fn on_payment_verifier_added(
        &self,
        store: &dyn LedgerStore,
        args: &PaymentVerifierAdded,
    ) -> Result<(), IndexerError> {
        let inserted = store
            .insert_payment_verifier(PaymentVerifierRow {
                verifier: args.verifier,
                fee_share: args.fee_share,
                active: true,
            })
            .await?;
        if !inserted {
            tracing::debug!(
                "[registry] verifier {} already registered, keeping existing row",
                args.verifier
            );
        }
        Ok(())
    }

    async fn on_payment_verifier_fee_updated(
        &self,
        store: &dyn LedgerStore,
        args: &PaymentVerifierFeeUpdated,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        store
            .set_payment_verifier_fee(args.verifier, args.fee_share)
            .await
            .map_err(|e| registry_integrity("PaymentVerifierFeeShareUpdated", ordered_id, e))
    }

    async fn on_payment_verifier_removed(
        &self,
        store: &dyn LedgerStore,
        args: &PaymentVerifierRemoved,
        ordered_id: Option<OrderedEventId>,
    ) -> Result<(), IndexerError> {
        store
            .set_payment_verifier_active(args.verifier, false)
            .await
            .map_err(|e| registry_integrity("PaymentVerifierRemoved", ordered_id, e))
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_action(
        &self,
        store: &dyn LedgerStore,
        meta: &EventMeta,
        order_id: OrderedEventId,
        log_id: LogId,
        deposit_id: u64,
        event: &'static str,
    ) -> Result<(), IndexerError> {
        store
            .insert_action(ActionRow {
                id: order_id,
                log_id,
                participant_id: ids::participant_id(meta.chain_id, meta.tx_from),
                transaction_id: ids::transaction_id(meta.chain_id, meta.tx_hash),
                deposit_id,
                event,
            })
            .await?;
        Ok(())
    }
}

fn block_row(meta: &EventMeta) -> BlockRow {
    BlockRow {
        id: ids::block_id(meta.chain_id, meta.block_hash),
        chain_id: meta.chain_id,
        number: meta.block_number,
        timestamp: meta.block_timestamp,
        hash: meta.block_hash,
    }
}

fn transaction_row(meta: &EventMeta) -> TransactionRow {
    TransactionRow {
        id: ids::transaction_id(meta.chain_id, meta.tx_hash),
        block_id: ids::block_id(meta.chain_id, meta.block_hash),
        hash: meta.tx_hash,
        index: meta.tx_index,
        from: meta.tx_from,
        to: meta.tx_to,
    }
}

fn participant_row(chain_id: u64, address: Address) -> ParticipantRow {
    ParticipantRow {
        id: ids::participant_id(chain_id, address),
        chain_id,
        address,
    }
}

/// Every deposit-scoped handler runs with an ordered id; `ordered_kind`
/// returns one for all of their event kinds, so this cannot miss.
fn expect_ordered(ordered_id: Option<OrderedEventId>) -> OrderedEventId {
    match ordered_id {
        Some(id) => id,
        None => unreachable!("deposit-scoped events always carry an ordered id"),
    }
}

fn signed(amount: U256) -> I256 {
    I256::try_from(amount).unwrap_or(I256::MAX)
}

fn sub_balance(
    before: I256,
    amount: U256,
    event: &'static str,
    ordered_id: Option<OrderedEventId>,
) -> Result<I256, IndexerError> {
    before.checked_sub(signed(amount)).ok_or_else(|| {
        IndexerError::integrity(event, ordered_id, "balance arithmetic overflow".to_string())
    })
}

/// `0 <= remaining <= deposited` must hold; a violation is recorded as an
/// anomaly with the value kept as-is.
fn check_balance(deposit_id: u64, remaining: I256, deposited: U256, event: &str) {
    if remaining.is_negative() || remaining > signed(deposited) {
        tracing::warn!(
            "[deposit {}] remaining {} outside [0, {}] after {}",
            deposit_id,
            remaining,
            deposited,
            event
        );
    }
}

fn registry_integrity(
    event: &'static str,
    ordered_id: Option<OrderedEventId>,
    e: StoreError,
) -> IndexerError {
    match e {
        StoreError::RowNotFound { key, .. } => IndexerError::integrity(
            event,
            ordered_id,
            format!("update for unregistered verifier {}", key),
        ),
        other => IndexerError::Store(other),
    }
}
