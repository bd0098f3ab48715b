use gas_common::types::Address;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid Hex String")]
    HexError(#[from] hex::FromHexError),
    #[error("Invalid Key")]
    KeyError,
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// secp256k1 key pair with its derived account address.
///
/// `Debug` never prints key material.
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Accepts 32 bytes of hex, with or without a `0x` prefix.
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, KeyError> {
        let trimmed = hex_str.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| KeyError::KeyError)?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = public_key_to_address(signing_key.verifying_key());
        Self { signing_key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest, returning a low-s signature and its recovery id.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<(Signature, RecoveryId), KeyError> {
        self.signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| KeyError::SigningFailed(e.to_string()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Account address: last 20 bytes of keccak-256 over the uncompressed public key.
pub fn public_key_to_address(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak_hash::keccak(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.0[12..]);
    Address(addr)
}
