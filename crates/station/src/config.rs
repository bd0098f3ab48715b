//! Gas station configuration

use gas_common::types::{ParseError, Wei};
use gas_common::utils::logging::LoggingConfig;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Hex-encoded funder signing key. `Debug` output is redacted.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct FunderSecret(String);

impl FunderSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FunderSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FunderSecret(<redacted>)")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {source}")]
    InvalidAmount {
        field: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("Invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Gas station service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Server address
    pub server_addr: String,

    /// JSON-RPC endpoint of the chain node
    pub rpc_url: String,

    /// Funder account private key; absence degrades both endpoints
    pub funder_private_key: Option<FunderSecret>,

    /// Amount sent per dispense (decimal ether)
    pub dispense_amount: String,

    /// Targets at or above this balance are already funded (decimal ether)
    pub threshold: String,

    /// Chain id for EIP-155 signing; queried from the node when unset
    pub chain_id: Option<u64>,

    /// Gas price in wei; queried from the node when unset
    pub gas_price: Option<String>,

    /// Gas limit for transfers
    pub gas_limit: u64,

    /// Timeout for each node request (seconds)
    pub rpc_timeout_secs: u64,

    /// How long a dispatched target stays blocked while its transfer lands (seconds)
    pub pending_ttl_secs: u64,

    /// Enable CORS
    pub cors_enabled: bool,

    pub logging: LoggingConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
            funder_private_key: None,
            dispense_amount: "0.00001".to_string(),
            threshold: "0.00001".to_string(),
            chain_id: None,
            gas_price: None,
            gas_limit: 21_000,
            rpc_timeout_secs: 30,
            pending_ttl_secs: 120,
            cors_enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

/// Validated numeric settings derived from [`StationConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispenseSettings {
    pub amount: Wei,
    pub threshold: Wei,
    pub chain_id: Option<u64>,
    pub gas_price: Option<u128>,
    pub gas_limit: u64,
}

impl StationConfig {
    /// Defaults, then the optional config file, then environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => gas_common::utils::config::load_config::<Self, _>(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("GAS_STATION_SERVER_ADDR") {
            self.server_addr = addr;
        }

        if let Some(rpc_url) = lookup("GAS_STATION_RPC_URL") {
            self.rpc_url = rpc_url;
        }

        if let Some(key) = lookup("FUNDER_PRIVATE_KEY") {
            self.funder_private_key = Some(FunderSecret::new(key));
        }

        if let Some(amount) = lookup("GAS_STATION_DISPENSE_AMOUNT") {
            self.dispense_amount = amount;
        }

        if let Some(threshold) = lookup("GAS_STATION_THRESHOLD") {
            self.threshold = threshold;
        }

        if let Some(chain_id) = lookup("GAS_STATION_CHAIN_ID") {
            match chain_id.parse() {
                Ok(id) => self.chain_id = Some(id),
                Err(_) => warn!("Ignoring invalid GAS_STATION_CHAIN_ID: {}", chain_id),
            }
        }

        if let Some(gas_price) = lookup("GAS_STATION_GAS_PRICE") {
            self.gas_price = Some(gas_price);
        }

        if let Some(gas_limit) = lookup("GAS_STATION_GAS_LIMIT") {
            self.gas_limit = gas_limit.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid GAS_STATION_GAS_LIMIT: {}", gas_limit);
                self.gas_limit
            });
        }

        if let Some(timeout) = lookup("GAS_STATION_RPC_TIMEOUT") {
            self.rpc_timeout_secs = timeout.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid GAS_STATION_RPC_TIMEOUT: {}", timeout);
                self.rpc_timeout_secs
            });
        }

        if let Some(ttl) = lookup("GAS_STATION_PENDING_TTL") {
            self.pending_ttl_secs = ttl.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid GAS_STATION_PENDING_TTL: {}", ttl);
                self.pending_ttl_secs
            });
        }

        self
    }

    /// Parse amounts and gas settings; malformed values are startup errors.
    pub fn dispense_settings(&self) -> Result<DispenseSettings, ConfigError> {
        let amount = Wei::from_ether_str(&self.dispense_amount)
            .map_err(|source| ConfigError::InvalidAmount { field: "dispense_amount", source })?;
        let threshold = Wei::from_ether_str(&self.threshold)
            .map_err(|source| ConfigError::InvalidAmount { field: "threshold", source })?;

        let gas_price = match &self.gas_price {
            Some(value) => Some(value.trim().parse::<u128>().map_err(|_| ConfigError::InvalidNumber {
                field: "gas_price",
                value: value.clone(),
            })?),
            None => None,
        };

        Ok(DispenseSettings {
            amount,
            threshold,
            chain_id: self.chain_id,
            gas_price,
            gas_limit: self.gas_limit,
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }
}
