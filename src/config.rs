//! Environment-based configuration

use std::env;

use alloy::primitives::U256;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub database_url: String,
    pub chain_id: u64,
    /// Minimum viable intent size: balances below this are underfunded
    /// regardless of the deposit's own minimum.
    pub min_viable_unit: U256,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "invalid {}: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl IndexerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let chain_id = env::var("CHAIN_ID")
            .map_err(|_| ConfigError::Missing("CHAIN_ID"))?
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid("CHAIN_ID", e.to_string()))?;
        let min_viable_unit = match env::var("MIN_VIABLE_UNIT") {
            Ok(raw) => raw
                .parse::<U256>()
                .map_err(|e| ConfigError::Invalid("MIN_VIABLE_UNIT", e.to_string()))?,
            Err(_) => U256::from(1u64),
        };
        Ok(Self {
            database_url,
            chain_id,
            min_viable_unit,
        })
    }
}
