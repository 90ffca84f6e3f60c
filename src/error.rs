//! Error taxonomy
//!
//! Integrity violations (a referenced entity is absent) abort the event
//! being applied and must be surfaced loudly by the caller. Invariant
//! breaches (negative balances or counters) are not errors: they are logged
//! as anomalies and the value is recorded as-is.

use crate::ids::OrderedEventId;

/// Failures at the store boundary.
#[derive(Debug)]
pub enum StoreError {
    Db(sea_orm::DbErr),
    /// A row that the caller requires is missing.
    RowNotFound { table: &'static str, key: String },
    /// A persisted value failed to parse back into its domain type.
    Corrupt { table: &'static str, detail: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Db(e) => write!(f, "database error: {}", e),
            StoreError::RowNotFound { table, key } => {
                write!(f, "row not found in {}: {}", table, key)
            }
            StoreError::Corrupt { table, detail } => {
                write!(f, "corrupt row in {}: {}", table, detail)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        StoreError::Db(e)
    }
}

/// Failures while applying one event.
#[derive(Debug)]
pub enum IndexerError {
    Store(StoreError),
    /// A referenced entity is absent: the event that should have created it
    /// was lost or delivered out of order. Fatal for the current event.
    Integrity {
        event: &'static str,
        ordered_id: Option<OrderedEventId>,
        detail: String,
    },
}

impl IndexerError {
    pub fn integrity(
        event: &'static str,
        ordered_id: Option<OrderedEventId>,
        detail: impl Into<String>,
    ) -> Self {
        IndexerError::Integrity {
            event,
            ordered_id,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for IndexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexerError::Store(e) => write!(f, "store error: {}", e),
            IndexerError::Integrity {
                event,
                ordered_id,
                detail,
            } => match ordered_id {
                Some(id) => write!(f, "integrity violation in {} ({}): {}", event, id, detail),
                None => write!(f, "integrity violation in {}: {}", event, detail),
            },
        }
    }
}

impl std::error::Error for IndexerError {}

impl From<StoreError> for IndexerError {
    fn from(e: StoreError) -> Self {
        IndexerError::Store(e)
    }
}
