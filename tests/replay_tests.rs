mod common;

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, I256};
use common::*;
use escrow_indexer::ids::{self, BucketWidth};
use escrow_indexer::lifecycle::DepositStatus;
use escrow_indexer::payee::{PayeeConfig, StaticPayeeReader};
use escrow_indexer::store::LedgerStore;

fn full_scenario() -> Vec<escrow_indexer::events::ChainEvent> {
    let hash = B256::repeat_byte(0xaa);
    vec![
        deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000),
        verifier_added(meta(1_000, 0, 1), 1),
        currency_added(meta(1_000, 0, 2), 1, 500),
        rate_updated(meta(1_010, 0, 0), 1, 510),
        intent_signaled(meta(1_020, 0, 0), hash, 1, 300),
        intent_fulfilled(meta(1_030, 0, 0), hash, 1, 300),
        deposit_withdrawn(meta(1_040, 0, 0), 1, 700),
    ]
}

#[tokio::test]
async fn replaying_the_whole_feed_changes_nothing() {
    let (store, dispatcher) = harness();

    for event in full_scenario() {
        dispatcher.apply(&event).await.unwrap();
    }

    let deposit_once = store.find_deposit(1).await.unwrap().unwrap();
    let actions_once = store.action_count();
    let versions_once = store.rate_versions_of(ids::currency_track_id(
        ids::verifier_track_id(CHAIN, VERIFIER, 1),
        CURRENCY,
    ));

    // Crash-recovery shape: the entire feed is delivered again.
    for event in full_scenario() {
        dispatcher.apply(&event).await.unwrap();
    }

    let deposit_twice = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit_once, deposit_twice);
    assert_eq!(deposit_twice.remaining, I256::ZERO);
    assert_eq!(deposit_twice.status, DepositStatus::Withdrawn);
    assert_eq!(store.action_count(), actions_once);
    assert_eq!(store.deltas_of(1).len(), 3);

    let versions_twice = store.rate_versions_of(ids::currency_track_id(
        ids::verifier_track_id(CHAIN, VERIFIER, 1),
        CURRENCY,
    ));
    assert_eq!(versions_once, versions_twice, "no spurious rate versions");

    // Additive counters must not double-count.
    let id = ids::stat_bucket_id(BucketWidth::Hour, 1_000, "deposit", TOKEN, None, Address::ZERO);
    let stat = store.find_stat(id).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(1_000).unwrap());
}

#[tokio::test]
async fn replaying_a_single_event_is_skipped() {
    let (store, dispatcher) = harness();

    let event = deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000);
    dispatcher.apply(&event).await.unwrap();
    dispatcher.apply(&event).await.unwrap();

    assert_eq!(store.action_count(), 1);
    assert_eq!(store.deltas_of(1).len(), 1);
}

#[tokio::test]
async fn failed_events_are_not_marked_applied() {
    let (store, dispatcher) = harness();

    // Out-of-order delivery: the rate update fails because its track does
    // not exist yet.
    let update = rate_updated(meta(1_010, 0, 0), 1, 510);
    dispatcher.apply(&update).await.unwrap_err();

    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    // Redelivery after the prerequisites landed must now take effect.
    dispatcher.apply(&update).await.unwrap();
    let versions = store.rate_versions_of(ids::currency_track_id(
        ids::verifier_track_id(CHAIN, VERIFIER, 1),
        CURRENCY,
    ));
    assert_eq!(versions.len(), 2);
}

#[tokio::test]
async fn a_store_failure_mid_event_rolls_the_whole_event_back() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000))
        .await
        .unwrap();

    // The connection drops between the balance write and the delta insert.
    let withdrawal = deposit_withdrawn(meta(1_010, 0, 0), 1, 300);
    store.fail_next_delta_insert();
    dispatcher.apply(&withdrawal).await.unwrap_err();

    // Nothing of the failed event may be visible, including the balance
    // write that preceded the failure.
    let deposit = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::try_from(1_000).unwrap());
    assert_eq!(store.deltas_of(1).len(), 1);

    // Redelivery applies the event exactly once, not on top of a
    // half-applied first attempt.
    dispatcher.apply(&withdrawal).await.unwrap();
    let deposit = store.find_deposit(1).await.unwrap().unwrap();
    assert_eq!(deposit.remaining, I256::try_from(700).unwrap());
    assert_eq!(store.deltas_of(1).len(), 2);
}

#[tokio::test]
async fn payee_config_is_fetched_once_and_cached() {
    let payees = Arc::new(StaticPayeeReader::new());
    payees.put(
        1,
        VERIFIER,
        PayeeConfig {
            intent_gating_service: GATING_SERVICE,
            payee_details: Bytes::from_static(b"acct-42"),
            data: Bytes::from_static(b"{}"),
        },
    );
    let (store, dispatcher) = harness_with_payees(payees);

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000))
        .await
        .unwrap();
    dispatcher
        .apply(&verifier_added(meta(1_000, 0, 1), 1))
        .await
        .unwrap();

    let details = store.find_payee_details(PAYEE_HASH).await.unwrap().unwrap();
    assert_eq!(details.payee_details, Bytes::from_static(b"acct-42"));
    assert_eq!(details.intent_gating_service, GATING_SERVICE);
}

#[tokio::test]
async fn missing_payee_config_is_not_fatal() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000))
        .await
        .unwrap();
    dispatcher
        .apply(&verifier_added(meta(1_000, 0, 1), 1))
        .await
        .unwrap();

    assert!(store.find_payee_details(PAYEE_HASH).await.unwrap().is_none());
    let track = store
        .find_verifier_track(ids::verifier_track_id(CHAIN, VERIFIER, 1))
        .await
        .unwrap();
    assert!(track.is_some(), "the track itself is still recorded");
}
