//! Shared fixtures: an in-memory harness around the dispatcher plus
//! builders for decoded chain events.

// Not every test binary uses every builder.
#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use escrow_indexer::dispatcher::Dispatcher;
use escrow_indexer::events::{
    ChainEvent, ConversionRateUpdated, DepositClosed, DepositCurrencyAdded, DepositReceived,
    DepositVerifierAdded, DepositWithdrawn, EscrowEvent, EventMeta, IntentFulfilled, IntentPruned,
    IntentSignaled, PaymentVerifierAdded, PaymentVerifierFeeUpdated, PaymentVerifierRemoved,
};
use escrow_indexer::payee::{NullPayeeReader, PayeeReader};
use escrow_indexer::store::memory::MemoryLedgerStore;

pub const CHAIN: u64 = 8453;
pub const DEPOSITOR: Address = Address::repeat_byte(0x11);
pub const VERIFIER: Address = Address::repeat_byte(0x22);
pub const TOKEN: Address = Address::repeat_byte(0x33);
pub const OWNER: Address = Address::repeat_byte(0x44);
pub const ESCROW: Address = Address::repeat_byte(0xee);
pub const CURRENCY: B256 = B256::repeat_byte(0x55);
pub const PAYEE_HASH: B256 = B256::repeat_byte(0x66);
pub const GATING_SERVICE: Address = Address::repeat_byte(0x77);

pub fn harness() -> (Arc<MemoryLedgerStore>, Dispatcher) {
    harness_with_payees(Arc::new(NullPayeeReader))
}

pub fn harness_with_payees(
    payees: Arc<dyn PayeeReader>,
) -> (Arc<MemoryLedgerStore>, Dispatcher) {
    let store = Arc::new(MemoryLedgerStore::new());
    let dispatcher = Dispatcher::new(store.clone(), payees, U256::from(1u64));
    (store, dispatcher)
}

/// Provenance for one log entry. Block and transaction hashes are derived
/// from the position so distinct logs never collide.
pub fn meta(timestamp: u64, tx_index: u32, log_index: u32) -> EventMeta {
    EventMeta {
        chain_id: CHAIN,
        block_number: timestamp / 2,
        block_timestamp: timestamp,
        block_hash: B256::from(U256::from(timestamp)),
        tx_hash: B256::from(U256::from(timestamp) * U256::from(1_000u64) + U256::from(tx_index)),
        tx_index,
        tx_from: DEPOSITOR,
        tx_to: ESCROW,
        log_index,
    }
}

pub fn deposit_received(
    meta: EventMeta,
    deposit_id: u64,
    amount: u64,
    min_amount: u64,
    max_amount: u64,
) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::DepositReceived(DepositReceived {
            deposit_id,
            depositor: DEPOSITOR,
            token: TOKEN,
            amount: U256::from(amount),
            min_amount: U256::from(min_amount),
            max_amount: U256::from(max_amount),
        }),
    }
}

pub fn deposit_withdrawn(meta: EventMeta, deposit_id: u64, amount: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::DepositWithdrawn(DepositWithdrawn {
            deposit_id,
            depositor: DEPOSITOR,
            amount: U256::from(amount),
        }),
    }
}

pub fn deposit_closed(meta: EventMeta, deposit_id: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::DepositClosed(DepositClosed {
            deposit_id,
            depositor: DEPOSITOR,
        }),
    }
}

pub fn verifier_added(meta: EventMeta, deposit_id: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::DepositVerifierAdded(DepositVerifierAdded {
            deposit_id,
            verifier: VERIFIER,
            payee_details_hash: PAYEE_HASH,
            intent_gating_service: GATING_SERVICE,
        }),
    }
}

pub fn currency_added(meta: EventMeta, deposit_id: u64, rate: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::DepositCurrencyAdded(DepositCurrencyAdded {
            deposit_id,
            verifier: VERIFIER,
            currency: CURRENCY,
            conversion_rate: U256::from(rate),
        }),
    }
}

pub fn rate_updated(meta: EventMeta, deposit_id: u64, rate: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::ConversionRateUpdated(ConversionRateUpdated {
            deposit_id,
            verifier: VERIFIER,
            currency: CURRENCY,
            new_conversion_rate: U256::from(rate),
        }),
    }
}

pub fn intent_signaled(
    meta: EventMeta,
    intent_hash: B256,
    deposit_id: u64,
    amount: u64,
) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::IntentSignaled(IntentSignaled {
            intent_hash,
            deposit_id,
            verifier: VERIFIER,
            owner: OWNER,
            to: OWNER,
            amount: U256::from(amount),
            currency: CURRENCY,
            conversion_rate: U256::ZERO,
        }),
    }
}

pub fn intent_pruned(meta: EventMeta, intent_hash: B256, deposit_id: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::IntentPruned(IntentPruned {
            intent_hash,
            deposit_id,
        }),
    }
}

pub fn intent_fulfilled(
    meta: EventMeta,
    intent_hash: B256,
    deposit_id: u64,
    amount: u64,
) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::IntentFulfilled(IntentFulfilled {
            intent_hash,
            deposit_id,
            verifier: VERIFIER,
            owner: OWNER,
            to: OWNER,
            amount: U256::from(amount),
            currency: CURRENCY,
            sustainability_fee: U256::from(1u64),
            verifier_fee: U256::from(2u64),
        }),
    }
}

pub fn payment_verifier_added(meta: EventMeta, verifier: Address, fee_share: u64) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::PaymentVerifierAdded(PaymentVerifierAdded {
            verifier,
            fee_share: U256::from(fee_share),
        }),
    }
}

pub fn payment_verifier_fee_updated(
    meta: EventMeta,
    verifier: Address,
    fee_share: u64,
) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::PaymentVerifierFeeUpdated(PaymentVerifierFeeUpdated {
            verifier,
            fee_share: U256::from(fee_share),
        }),
    }
}

pub fn payment_verifier_removed(meta: EventMeta, verifier: Address) -> ChainEvent {
    ChainEvent {
        meta,
        body: EscrowEvent::PaymentVerifierRemoved(PaymentVerifierRemoved { verifier }),
    }
}

/// Open deposit `deposit_id` and its (verifier, currency) track in three
/// consecutive logs of one block.
pub async fn open_deposit_with_track(
    dispatcher: &Dispatcher,
    timestamp: u64,
    deposit_id: u64,
    amount: u64,
    min_amount: u64,
    rate: u64,
) {
    dispatcher
        .apply(&deposit_received(
            meta(timestamp, 0, 0),
            deposit_id,
            amount,
            min_amount,
            amount,
        ))
        .await
        .expect("deposit");
    dispatcher
        .apply(&verifier_added(meta(timestamp, 0, 1), deposit_id))
        .await
        .expect("verifier");
    dispatcher
        .apply(&currency_added(meta(timestamp, 0, 2), deposit_id, rate))
        .await
        .expect("currency");
}
