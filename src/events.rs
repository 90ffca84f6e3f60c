//! Decoded escrow-contract events
//!
//! The inbound feed delivers one decoded event at a time, in chain order.
//! Event kinds form a closed enum so dispatch is exhaustively matched; there
//! is no dynamically keyed handler table.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::ids::OrderedKind;

/// Chain provenance shared by every event: originating block, transaction
/// and log position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub block_hash: B256,
    pub tx_hash: B256,
    pub tx_index: u32,
    pub tx_from: Address,
    pub tx_to: Address,
    pub log_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceived {
    pub deposit_id: u64,
    pub depositor: Address,
    pub token: Address,
    pub amount: U256,
    pub min_amount: U256,
    pub max_amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositWithdrawn {
    pub deposit_id: u64,
    pub depositor: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositClosed {
    pub deposit_id: u64,
    pub depositor: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositVerifierAdded {
    pub deposit_id: u64,
    pub verifier: Address,
    pub payee_details_hash: B256,
    pub intent_gating_service: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositCurrencyAdded {
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    pub conversion_rate: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRateUpdated {
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    pub new_conversion_rate: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSignaled {
    pub intent_hash: B256,
    pub deposit_id: u64,
    pub verifier: Address,
    pub owner: Address,
    pub to: Address,
    pub amount: U256,
    pub currency: B256,
    pub conversion_rate: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPruned {
    pub intent_hash: B256,
    pub deposit_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentFulfilled {
    pub intent_hash: B256,
    pub deposit_id: u64,
    pub verifier: Address,
    pub owner: Address,
    pub to: Address,
    pub amount: U256,
    pub currency: B256,
    pub sustainability_fee: U256,
    pub verifier_fee: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifierAdded {
    pub verifier: Address,
    pub fee_share: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifierFeeUpdated {
    pub verifier: Address,
    pub fee_share: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifierRemoved {
    pub verifier: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "args")]
pub enum EscrowEvent {
    DepositReceived(DepositReceived),
    DepositWithdrawn(DepositWithdrawn),
    DepositClosed(DepositClosed),
    DepositVerifierAdded(DepositVerifierAdded),
    DepositCurrencyAdded(DepositCurrencyAdded),
    ConversionRateUpdated(ConversionRateUpdated),
    IntentSignaled(IntentSignaled),
    IntentPruned(IntentPruned),
    IntentFulfilled(IntentFulfilled),
    PaymentVerifierAdded(PaymentVerifierAdded),
    PaymentVerifierFeeUpdated(PaymentVerifierFeeUpdated),
    PaymentVerifierRemoved(PaymentVerifierRemoved),
}

impl EscrowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EscrowEvent::DepositReceived(_) => "DepositReceived",
            EscrowEvent::DepositWithdrawn(_) => "DepositWithdrawn",
            EscrowEvent::DepositClosed(_) => "DepositClosed",
            EscrowEvent::DepositVerifierAdded(_) => "DepositVerifierAdded",
            EscrowEvent::DepositCurrencyAdded(_) => "DepositCurrencyAdded",
            EscrowEvent::ConversionRateUpdated(_) => "DepositConversionRateUpdated",
            EscrowEvent::IntentSignaled(_) => "IntentSignaled",
            EscrowEvent::IntentPruned(_) => "IntentPruned",
            EscrowEvent::IntentFulfilled(_) => "IntentFulfilled",
            EscrowEvent::PaymentVerifierAdded(_) => "PaymentVerifierAdded",
            EscrowEvent::PaymentVerifierFeeUpdated(_) => "PaymentVerifierFeeShareUpdated",
            EscrowEvent::PaymentVerifierRemoved(_) => "PaymentVerifierRemoved",
        }
    }

    /// Position of this kind in the fixed merge order. Verifier-registry
    /// events carry no deposit scope and are journaled by log id instead.
    pub fn ordered_kind(&self) -> Option<OrderedKind> {
        match self {
            EscrowEvent::DepositReceived(_) => Some(OrderedKind::DepositOpen),
            EscrowEvent::DepositWithdrawn(_) => Some(OrderedKind::Withdrawal),
            EscrowEvent::DepositClosed(_) => Some(OrderedKind::Closed),
            EscrowEvent::DepositVerifierAdded(_) => Some(OrderedKind::VerifierAdded),
            EscrowEvent::DepositCurrencyAdded(_) => Some(OrderedKind::CurrencyAdded),
            EscrowEvent::ConversionRateUpdated(_) => Some(OrderedKind::RateUpdate),
            EscrowEvent::IntentSignaled(_) => Some(OrderedKind::IntentSignaled),
            EscrowEvent::IntentPruned(_) => Some(OrderedKind::IntentPruned),
            EscrowEvent::IntentFulfilled(_) => Some(OrderedKind::IntentFulfilled),
            EscrowEvent::PaymentVerifierAdded(_)
            | EscrowEvent::PaymentVerifierFeeUpdated(_)
            | EscrowEvent::PaymentVerifierRemoved(_) => None,
        }
    }
}

/// One fully decoded event as delivered by the log source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub meta: EventMeta,
    pub body: EscrowEvent,
}
