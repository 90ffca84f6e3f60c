//! Time-bucketed statistics
//!
//! Maintains hour/day/month counters per (action, token, currency, verifier)
//! tuple. The three upserts per event are independent and commutative, so
//! they are issued concurrently. A negative running counter indicates an
//! accounting defect upstream: it is flagged and stored as-is, never
//! corrected here.

use alloy::primitives::{Address, B256, I256, U256};

use crate::error::IndexerError;
use crate::ids::{self, BucketWidth};
use crate::store::{LedgerStore, StatAction, StatRow};

/// Fold one qualifying event into all three bucket widths.
pub async fn record(
    store: &dyn LedgerStore,
    timestamp: u64,
    action: StatAction,
    token: Address,
    currency: Option<B256>,
    verifier: Address,
    amount: U256,
) -> Result<(), IndexerError> {
    let amount = match I256::try_from(amount) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(
                "[stats] amount {} exceeds signed counter range ({} {})",
                amount,
                action.as_str(),
                token
            );
            I256::MAX
        }
    };

    let (hour, day, month) = tokio::join!(
        merge(store, BucketWidth::Hour, timestamp, action, token, currency, verifier, amount),
        merge(store, BucketWidth::Day, timestamp, action, token, currency, verifier, amount),
        merge(store, BucketWidth::Month, timestamp, action, token, currency, verifier, amount),
    );
    hour?;
    day?;
    month?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn merge(
    store: &dyn LedgerStore,
    width: BucketWidth,
    timestamp: u64,
    action: StatAction,
    token: Address,
    currency: Option<B256>,
    verifier: Address,
    amount: I256,
) -> Result<(), IndexerError> {
    let id = ids::stat_bucket_id(width, timestamp, action.as_str(), token, currency, verifier);
    let merged = store
        .merge_stat(StatRow {
            id,
            width,
            bucket_start: width.bucket_start(timestamp),
            action,
            token,
            currency,
            verifier,
            amount,
        })
        .await?;
    if merged.is_negative() {
        tracing::warn!(
            "[stats] negative counter {} in bucket {} ({} {} {} verifier {})",
            merged,
            id,
            width.as_str(),
            action.as_str(),
            token,
            verifier
        );
    }
    Ok(())
}
