//! Chain capabilities consumed by the dispenser

use crate::error::StationResult;
use async_trait::async_trait;
use gas_common::types::{Address, TxHash, Wei};
use gas_crypto::KeyPair;

/// Reads account balances from the chain.
///
/// Implementations must return `StationError::Network` when the balance is
/// unknown; a zero balance is only ever a real observation.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn get_balance(&self, address: &Address) -> StationResult<Wei>;
}

/// Signs and broadcasts a native transfer from the funder.
///
/// Returns once the node accepts the transaction for broadcast; inclusion
/// in a block is not awaited.
#[async_trait]
pub trait TransferSubmitter: Send + Sync {
    async fn submit_transfer(&self, funder: &KeyPair, to: &Address, amount: Wei) -> StationResult<TxHash>;
}
