//! secp256k1 keys and native-transfer signing for the funder account.

pub mod ecdsa;
pub mod transaction;

pub use ecdsa::{public_key_to_address, KeyError, KeyPair};
pub use transaction::{LegacyTransaction, SignedTransaction, TxError};
