//! Funder identity derived from the configured secret

use crate::config::FunderSecret;
use crate::error::{StationError, StationResult};
use gas_common::types::Address;
use gas_crypto::KeyPair;
use tracing::{info, warn};

/// The single funding account, or the reason it is unavailable
#[derive(Debug)]
pub enum FunderIdentity {
    Configured(KeyPair),
    Unconfigured(String),
}

impl FunderIdentity {
    /// Never fails: a missing or malformed secret yields `Unconfigured`.
    pub fn from_secret(secret: Option<&FunderSecret>) -> Self {
        let secret = match secret {
            Some(secret) if !secret.expose().trim().is_empty() => secret,
            _ => {
                warn!("FUNDER_PRIVATE_KEY is not set; dispensing is disabled");
                return FunderIdentity::Unconfigured("funder private key is not set".to_string());
            }
        };

        match KeyPair::from_private_key_hex(secret.expose()) {
            Ok(key) => {
                info!("Funder address: {}", key.address());
                FunderIdentity::Configured(key)
            }
            Err(e) => {
                warn!("Funder private key rejected ({}); dispensing is disabled", e);
                FunderIdentity::Unconfigured(format!("invalid funder private key: {}", e))
            }
        }
    }

    pub fn key(&self) -> StationResult<&KeyPair> {
        match self {
            FunderIdentity::Configured(key) => Ok(key),
            FunderIdentity::Unconfigured(reason) => Err(StationError::NotConfigured(reason.clone())),
        }
    }

    pub fn address(&self) -> StationResult<Address> {
        self.key().map(KeyPair::address)
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, FunderIdentity::Configured(_))
    }
}
