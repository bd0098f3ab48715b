use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const HASH_LENGTH: usize = 32;
pub const ADDRESS_LENGTH: usize = 20;
pub const ETHER_DECIMALS: usize = 18;
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Errors raised when parsing textual addresses, hashes and amounts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,

    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

fn strip_hex_prefix(s: &str) -> Result<&str, ParseError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(ParseError::MissingPrefix)
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let digits = strip_hex_prefix(s)?;
    if digits.len() != N * 2 {
        return Err(ParseError::InvalidLength {
            expected: N * 2,
            actual: digits.len(),
        });
    }
    let mut arr = [0u8; N];
    hex::decode_to_slice(digits, &mut arr)?;
    Ok(arr)
}

// --- Address ---

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Lowercase `0x`-prefixed hex, the form JSON-RPC nodes expect.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak_hash::keccak(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash.0[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ParseError;

    /// Accepts `0x` followed by exactly 40 hex characters, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<ADDRESS_LENGTH>(s).map(Address)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// --- TxHash ---

/// Transaction hash as reported by the node on broadcast
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxHash(pub [u8; HASH_LENGTH]);

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<HASH_LENGTH>(s).map(TxHash)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for TxHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// --- Wei ---

/// Amount in the smallest native currency unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    /// Parses a decimal ether amount such as `"0.00001"` or `"1"`.
    pub fn from_ether_str(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        let invalid = || ParseError::InvalidAmount(s.to_string());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > ETHER_DECIMALS {
            return Err(invalid());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = ETHER_DECIMALS);
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(frac))
            .map(Wei)
            .ok_or_else(invalid)
    }

    /// Renders as decimal ether with trailing zeros trimmed.
    pub fn to_ether_string(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0>width$}", frac, width = ETHER_DECIMALS);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }

    /// Parses a JSON-RPC quantity (`0x`-prefixed, no leading zero padding required).
    pub fn from_hex_quantity(s: &str) -> Result<Self, ParseError> {
        let digits = strip_hex_prefix(s)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidAmount(s.to_string()));
        }
        u128::from_str_radix(digits, 16)
            .map(Wei)
            .map_err(|_| ParseError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Wei(value)
    }
}
