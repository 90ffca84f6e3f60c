//! Auxiliary off-chain payee-configuration reader
//!
//! Verifier-added events carry only the hash of the payee configuration;
//! the full record lives off-chain and is fetched through this interface,
//! then cached in the `payee_details` table.

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct PayeeConfig {
    pub intent_gating_service: Address,
    pub payee_details: Bytes,
    pub data: Bytes,
}

#[derive(Debug)]
pub enum PayeeReadError {
    Unavailable(String),
    NotFound { deposit_id: u64, verifier: Address },
}

impl std::fmt::Display for PayeeReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayeeReadError::Unavailable(msg) => write!(f, "payee reader unavailable: {}", msg),
            PayeeReadError::NotFound {
                deposit_id,
                verifier,
            } => write!(
                f,
                "no payee config for deposit {} / verifier {}",
                deposit_id, verifier
            ),
        }
    }
}

impl std::error::Error for PayeeReadError {}

#[async_trait]
pub trait PayeeReader: Send + Sync {
    async fn payee_config(
        &self,
        deposit_id: u64,
        verifier: Address,
    ) -> Result<PayeeConfig, PayeeReadError>;
}

/// Reader for deployments without an off-chain payee source configured.
pub struct NullPayeeReader;

#[async_trait]
impl PayeeReader for NullPayeeReader {
    async fn payee_config(
        &self,
        deposit_id: u64,
        verifier: Address,
    ) -> Result<PayeeConfig, PayeeReadError> {
        Err(PayeeReadError::NotFound {
            deposit_id,
            verifier,
        })
    }
}

/// Fixed in-memory reader, used by the test suite.
#[derive(Default)]
pub struct StaticPayeeReader {
    configs: parking_lot::RwLock<std::collections::HashMap<(u64, Address), PayeeConfig>>,
}

impl StaticPayeeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, deposit_id: u64, verifier: Address, config: PayeeConfig) {
        self.configs.write().insert((deposit_id, verifier), config);
    }
}

#[async_trait]
impl PayeeReader for StaticPayeeReader {
    async fn payee_config(
        &self,
        deposit_id: u64,
        verifier: Address,
    ) -> Result<PayeeConfig, PayeeReadError> {
        self.configs
            .read()
            .get(&(deposit_id, verifier))
            .cloned()
            .ok_or(PayeeReadError::NotFound {
                deposit_id,
                verifier,
            })
    }
}
