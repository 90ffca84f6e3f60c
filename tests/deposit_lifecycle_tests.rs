mod common;

use alloy::primitives::{B256, I256, U256};
use common::*;
use escrow_indexer::error::IndexerError;
use escrow_indexer::lifecycle::DepositStatus;
use escrow_indexer::store::{IntentState, LedgerStore};

#[tokio::test]
async fn partial_withdrawal_below_minimum_goes_underfunded() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_withdrawn(meta(1_010, 0, 0), 1, 950))
        .await
        .unwrap();

    let deposit = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::try_from(50).unwrap());
    assert_eq!(deposit.status, DepositStatus::Underfunded);
    assert_eq!(deposit.deposited, U256::from(1_000u64));

    let deltas = store.deltas_of(1);
    assert_eq!(deltas.len(), 2);
    assert_eq!(deltas[1].amount_before, I256::try_from(1_000).unwrap());
    assert_eq!(deltas[1].delta, I256::try_from(-950).unwrap());
    assert_eq!(deltas[1].amount_after, I256::try_from(50).unwrap());
}

#[tokio::test]
async fn fulfillment_to_zero_keeps_underfunded_status() {
    let (store, dispatcher) = harness();
    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    dispatcher
        .apply(&deposit_withdrawn(meta(1_010, 0, 0), 1, 950))
        .await
        .unwrap();

    let hash = B256::repeat_byte(0xaa);
    dispatcher
        .apply(&intent_signaled(meta(1_020, 0, 0), hash, 1, 50))
        .await
        .unwrap();
    dispatcher
        .apply(&intent_fulfilled(meta(1_030, 0, 0), hash, 1, 50))
        .await
        .unwrap();

    // Drained, but never re-evaluated upward or flipped to closed.
    let deposit = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::ZERO);
    assert_eq!(deposit.status, DepositStatus::Underfunded);

    let intent = store.find_intent(hash).await.unwrap().unwrap();
    assert_eq!(intent.state, IntentState::Fulfilled);
    assert_eq!(intent.sustainability_fee, Some(U256::from(1u64)));
    assert_eq!(intent.verifier_fee, Some(U256::from(2u64)));
    assert!(intent.resolved_log_id.is_some());
}

#[tokio::test]
async fn full_withdrawal_marks_withdrawn() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 7, 1_000, 100, 1_000))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_withdrawn(meta(1_010, 0, 0), 7, 1_000))
        .await
        .unwrap();

    let deposit = store.find_deposit(7).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::ZERO);
    assert_eq!(deposit.status, DepositStatus::Withdrawn);
}

#[tokio::test]
async fn withdrawal_after_close_stays_closed() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 3, 500, 10, 500))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_closed(meta(1_010, 0, 0), 3))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_withdrawn(meta(1_020, 0, 0), 3, 500))
        .await
        .unwrap();

    // The withdrawal is journaled but the terminal state survives.
    let deposit = store.find_deposit(3).await.unwrap().unwrap();
    assert_eq!(deposit.status, DepositStatus::Closed);
    assert_eq!(deposit.remaining, I256::ZERO);
    assert_eq!(store.deltas_of(3).len(), 2);
}

#[tokio::test]
async fn overdraw_is_recorded_as_negative() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 9, 100, 10, 100))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_withdrawn(meta(1_010, 0, 0), 9, 150))
        .await
        .unwrap();

    // Anomalous balance is kept verbatim, not clamped to zero.
    let deposit = store.find_deposit(9).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::try_from(-50).unwrap());
    assert_eq!(deposit.status, DepositStatus::Withdrawn);
}

#[tokio::test]
async fn withdrawal_from_unknown_deposit_is_an_integrity_error() {
    let (_store, dispatcher) = harness();

    let err = dispatcher
        .apply(&deposit_withdrawn(meta(1_000, 0, 0), 42, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Integrity { .. }), "{err}");
}

#[tokio::test]
async fn duplicate_deposit_received_keeps_the_first_row() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 5, 1_000, 100, 1_000))
        .await
        .unwrap();
    // Same deposit id from a later log with different terms.
    dispatcher
        .apply(&deposit_received(meta(1_050, 0, 0), 5, 7_777, 1, 7_777))
        .await
        .unwrap();

    let deposit = store.find_deposit(5).await.unwrap().unwrap();
    assert_eq!(deposit.deposited, U256::from(1_000u64));
    assert_eq!(deposit.min_amount, U256::from(100u64));
    assert_eq!(store.deltas_of(5).len(), 1);
    // Both events are still journaled.
    assert_eq!(store.action_count(), 2);
}

#[tokio::test]
async fn pruned_intent_leaves_the_balance_untouched() {
    let (store, dispatcher) = harness();
    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    let hash = B256::repeat_byte(0xbb);
    dispatcher
        .apply(&intent_signaled(meta(1_020, 0, 0), hash, 1, 300))
        .await
        .unwrap();
    dispatcher
        .apply(&intent_pruned(meta(1_030, 0, 0), hash, 1))
        .await
        .unwrap();

    let intent = store.find_intent(hash).await.unwrap().unwrap();
    assert_eq!(intent.state, IntentState::Pruned);
    assert_eq!(intent.sustainability_fee, None);

    let deposit = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::try_from(1_000).unwrap());
    assert_eq!(deposit.status, DepositStatus::Active);
}

#[tokio::test]
async fn fulfillment_of_unsignaled_intent_is_an_integrity_error() {
    let (_store, dispatcher) = harness();

    let err = dispatcher
        .apply(&intent_fulfilled(
            meta(1_000, 0, 0),
            B256::repeat_byte(0xcc),
            1,
            10,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Integrity { .. }), "{err}");
}
