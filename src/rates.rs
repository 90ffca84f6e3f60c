//! Conversion-rate tracks
//!
//! Per (deposit, verifier, currency) track: a linear append-only history of
//! rate versions with exactly one active version, and a pointer on the
//! track-open record to the active one. Intents freeze the version id (not
//! the value) active at signal time, so later updates never change an
//! already-signaled intent's effective rate.

use alloy::primitives::{Address, B256, U256};

use crate::error::IndexerError;
use crate::ids::{self, LogId, OrderedEventId};
use crate::store::{CurrencyTrackRow, LedgerStore, RateVersionRow};

pub struct OpenTrack {
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    pub initial_rate: U256,
    pub verifier_track_id: B256,
    pub transaction_id: B256,
    pub participant_id: B256,
}

pub struct RateUpdate {
    pub order_id: OrderedEventId,
    pub log_id: LogId,
    pub chain_id: u64,
    pub deposit_id: u64,
    pub verifier: Address,
    pub currency: B256,
    pub new_rate: U256,
    pub transaction_id: B256,
}

/// Open a currency track: version `change_id = 0` is created active and
/// the track-open record points at it. Returns the currency-track id.
pub async fn open_track(store: &dyn LedgerStore, open: OpenTrack) -> Result<B256, IndexerError> {
    let track_id = ids::currency_track_id(open.verifier_track_id, open.currency);
    if store.find_currency_track(track_id).await?.is_some() {
        tracing::debug!(
            "[rates] track {} already open for deposit {}",
            track_id,
            open.deposit_id
        );
        return Ok(track_id);
    }

    let version_id = ids::rate_version_id(track_id, 0);
    store
        .insert_rate_version(RateVersionRow {
            id: version_id,
            order_id: open.order_id,
            log_id: open.log_id,
            currency_track_id: track_id,
            verifier_track_id: open.verifier_track_id,
            deposit_id: open.deposit_id,
            verifier: open.verifier,
            currency: open.currency,
            change_id: 0,
            value: open.initial_rate,
            active: true,
            transaction_id: open.transaction_id,
        })
        .await?;
    store
        .insert_currency_track(CurrencyTrackRow {
            id: track_id,
            order_id: open.order_id,
            log_id: open.log_id,
            deposit_id: open.deposit_id,
            verifier: open.verifier,
            currency: open.currency,
            verifier_track_id: open.verifier_track_id,
            current_rate_version_id: version_id,
            transaction_id: open.transaction_id,
            participant_id: open.participant_id,
        })
        .await?;

    tracing::debug!(
        "[rates] opened track {} (deposit {}, rate {})",
        track_id,
        open.deposit_id,
        open.initial_rate
    );
    Ok(track_id)
}

/// Append the next rate version: flip the current version inactive,
/// insert its successor active, repoint the track. A missing track or
/// missing current version means the events that should have preceded
/// this one were lost: fatal integrity violation, nothing is written.
pub async fn update_rate(
    store: &dyn LedgerStore,
    update: RateUpdate,
) -> Result<B256, IndexerError> {
    let verifier_track =
        ids::verifier_track_id(update.chain_id, update.verifier, update.deposit_id);
    let track_id = ids::currency_track_id(verifier_track, update.currency);

    let track = store.find_currency_track(track_id).await?.ok_or_else(|| {
        IndexerError::integrity(
            "DepositConversionRateUpdated",
            Some(update.order_id),
            format!(
                "rate update for unopened track {} (deposit {})",
                track_id, update.deposit_id
            ),
        )
    })?;
    let current = store
        .find_rate_version(track.current_rate_version_id)
        .await?
        .ok_or_else(|| {
            IndexerError::integrity(
                "DepositConversionRateUpdated",
                Some(update.order_id),
                format!(
                    "track {} points at missing version {}",
                    track_id, track.current_rate_version_id
                ),
            )
        })?;

    let next_change_id = current.change_id + 1;
    let next_id = ids::rate_version_id(track_id, next_change_id);

    store.set_rate_version_active(current.id, false).await?;
    store
        .insert_rate_version(RateVersionRow {
            id: next_id,
            order_id: update.order_id,
            log_id: update.log_id,
            currency_track_id: track_id,
            verifier_track_id: verifier_track,
            deposit_id: update.deposit_id,
            verifier: update.verifier,
            currency: update.currency,
            change_id: next_change_id,
            value: update.new_rate,
            active: true,
            transaction_id: update.transaction_id,
        })
        .await?;
    store.repoint_currency_track(track_id, next_id).await?;

    tracing::debug!(
        "[rates] track {} advanced to change {} (rate {})",
        track_id,
        next_change_id,
        update.new_rate
    );
    Ok(track_id)
}
