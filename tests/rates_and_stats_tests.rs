mod common;

use alloy::primitives::{Address, B256, I256};
use common::*;
use escrow_indexer::error::IndexerError;
use escrow_indexer::ids::{self, BucketWidth};
use escrow_indexer::store::{LedgerStore, StatAction};

fn track_id() -> B256 {
    ids::currency_track_id(ids::verifier_track_id(CHAIN, VERIFIER, 1), CURRENCY)
}

#[tokio::test]
async fn rate_history_is_gapless_with_one_active_version() {
    let (store, dispatcher) = harness();
    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    dispatcher
        .apply(&rate_updated(meta(1_010, 0, 0), 1, 510))
        .await
        .unwrap();
    dispatcher
        .apply(&rate_updated(meta(1_020, 0, 0), 1, 520))
        .await
        .unwrap();

    let versions = store.rate_versions_of(track_id());
    assert_eq!(versions.len(), 3);
    for (i, version) in versions.iter().enumerate() {
        assert_eq!(version.change_id, i as u32);
        assert_eq!(version.active, i == 2, "only the latest version is active");
    }
    assert_eq!(versions[2].value, alloy::primitives::U256::from(520u64));

    let track = store.find_currency_track(track_id()).await.unwrap().unwrap();
    assert_eq!(track.current_rate_version_id, versions[2].id);
}

#[tokio::test]
async fn intent_freezes_the_rate_version_active_at_signal() {
    let (store, dispatcher) = harness();
    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    dispatcher
        .apply(&rate_updated(meta(1_010, 0, 0), 1, 510))
        .await
        .unwrap();

    let hash = B256::repeat_byte(0xaa);
    dispatcher
        .apply(&intent_signaled(meta(1_020, 0, 0), hash, 1, 200))
        .await
        .unwrap();

    // A later update must not move the intent's reference.
    dispatcher
        .apply(&rate_updated(meta(1_030, 0, 0), 1, 520))
        .await
        .unwrap();
    dispatcher
        .apply(&intent_fulfilled(meta(1_040, 0, 0), hash, 1, 200))
        .await
        .unwrap();

    let intent = store.find_intent(hash).await.unwrap().unwrap();
    assert_eq!(intent.rate_version_id, ids::rate_version_id(track_id(), 1));
}

#[tokio::test]
async fn rate_update_for_an_unopened_track_is_an_integrity_error() {
    let (_store, dispatcher) = harness();
    let err = dispatcher
        .apply(&rate_updated(meta(1_000, 0, 0), 1, 500))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Integrity { .. }), "{err}");
}

#[tokio::test]
async fn intent_against_an_unopened_track_is_an_integrity_error() {
    let (_store, dispatcher) = harness();
    dispatcher
        .apply(&deposit_received(meta(1_000, 0, 0), 1, 1_000, 100, 1_000))
        .await
        .unwrap();

    let err = dispatcher
        .apply(&intent_signaled(
            meta(1_010, 0, 0),
            B256::repeat_byte(0xdd),
            1,
            100,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Integrity { .. }), "{err}");
}

#[tokio::test]
async fn deposits_in_one_hour_share_a_bucket_and_split_across_hours() {
    let (store, dispatcher) = harness();

    // Two deposits inside hour 0, one in hour 1.
    dispatcher
        .apply(&deposit_received(meta(100, 0, 0), 1, 100, 1, 100))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_received(meta(200, 0, 0), 2, 250, 1, 250))
        .await
        .unwrap();
    dispatcher
        .apply(&deposit_received(meta(3_700, 0, 0), 3, 40, 1, 40))
        .await
        .unwrap();

    let hour0 = ids::stat_bucket_id(BucketWidth::Hour, 100, "deposit", TOKEN, None, Address::ZERO);
    let stat = store.find_stat(hour0).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(350).unwrap());
    assert_eq!(stat.bucket_start, 0);

    let hour1 =
        ids::stat_bucket_id(BucketWidth::Hour, 3_700, "deposit", TOKEN, None, Address::ZERO);
    let stat = store.find_stat(hour1).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(40).unwrap());

    // The day bucket absorbs all three.
    let day = ids::stat_bucket_id(BucketWidth::Day, 100, "deposit", TOKEN, None, Address::ZERO);
    let stat = store.find_stat(day).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(390).unwrap());
}

#[tokio::test]
async fn duplicate_deposit_received_does_not_inflate_the_bucket() {
    let (store, dispatcher) = harness();

    dispatcher
        .apply(&deposit_received(meta(100, 0, 0), 1, 1_000, 1, 1_000))
        .await
        .unwrap();
    // Same deposit id from a different log, in the same hour. The row is
    // kept as-is and the phantom amount must not reach the counters.
    dispatcher
        .apply(&deposit_received(meta(200, 0, 0), 1, 7_777, 1, 7_777))
        .await
        .unwrap();

    let id = ids::stat_bucket_id(BucketWidth::Hour, 100, "deposit", TOKEN, None, Address::ZERO);
    let stat = store.find_stat(id).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(1_000).unwrap());
}

#[tokio::test]
async fn fulfillment_stats_are_keyed_by_currency_and_verifier() {
    let (store, dispatcher) = harness();
    open_deposit_with_track(&dispatcher, 1_000, 1, 1_000, 100, 500).await;

    let hash = B256::repeat_byte(0xaa);
    dispatcher
        .apply(&intent_signaled(meta(1_010, 0, 0), hash, 1, 300))
        .await
        .unwrap();
    dispatcher
        .apply(&intent_fulfilled(meta(1_020, 0, 0), hash, 1, 300))
        .await
        .unwrap();

    let id = ids::stat_bucket_id(
        BucketWidth::Hour,
        1_020,
        StatAction::Exchange.as_str(),
        TOKEN,
        Some(CURRENCY),
        VERIFIER,
    );
    let stat = store.find_stat(id).await.unwrap().unwrap();
    assert_eq!(stat.amount, I256::try_from(300).unwrap());
    assert_eq!(stat.currency, Some(CURRENCY));
    assert_eq!(stat.verifier, VERIFIER);
}

#[tokio::test]
async fn verifier_registry_tracks_fee_and_removal() {
    let (store, dispatcher) = harness();
    let verifier = Address::repeat_byte(0x99);

    dispatcher
        .apply(&payment_verifier_added(meta(1_000, 0, 0), verifier, 30))
        .await
        .unwrap();
    dispatcher
        .apply(&payment_verifier_fee_updated(meta(1_010, 0, 0), verifier, 45))
        .await
        .unwrap();

    let row = store.find_payment_verifier(verifier).await.unwrap().unwrap();
    assert_eq!(row.fee_share, alloy::primitives::U256::from(45u64));
    assert!(row.active);

    dispatcher
        .apply(&payment_verifier_removed(meta(1_020, 0, 0), verifier))
        .await
        .unwrap();
    let row = store.find_payment_verifier(verifier).await.unwrap().unwrap();
    assert!(!row.active);
}

#[tokio::test]
async fn fee_update_for_an_unregistered_verifier_is_an_integrity_error() {
    let (_store, dispatcher) = harness();
    let err = dispatcher
        .apply(&payment_verifier_fee_updated(
            meta(1_000, 0, 0),
            Address::repeat_byte(0x98),
            10,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Integrity { .. }), "{err}");
}
