//! Shared fixtures: an in-memory chain standing in for the node.

#![allow(dead_code)]

use async_trait::async_trait;
use gas_common::types::{Address, TxHash, Wei, WEI_PER_ETHER};
use gas_common::utils::logging::init_test_logging;
use gas_crypto::KeyPair;
use gas_station::{
    BalanceOracle, DispensePolicy, Dispenser, FunderIdentity, FunderSecret, StationError, StationMetrics,
    StationResult, TransferSubmitter,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Private key 1; address 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf
pub const FUNDER_SECRET: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
pub const FUNDER_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
pub const TARGET: &str = "0x000000000000000000000000000000000000dEaD";

/// 0.00001 ether
pub const GAS_AMOUNT: Wei = Wei(10_000_000_000_000);
pub const ONE_ETHER: Wei = Wei(WEI_PER_ETHER);

pub fn addr(s: &str) -> Address {
    s.parse().expect("valid test address")
}

#[derive(Default)]
pub struct MockChain {
    balances: Mutex<HashMap<Address, Wei>>,
    transfers: Mutex<Vec<(Address, Address, Wei)>>,
    balance_calls: AtomicUsize,
    /// Credit the target as soon as a transfer is submitted
    pub credit_on_transfer: AtomicBool,
    pub fail_balance: AtomicBool,
    pub fail_submit: AtomicBool,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_balance(&self, address: &str, balance: Wei) {
        self.balances.lock().unwrap().insert(addr(address), balance);
    }

    pub fn balance_of(&self, address: &str) -> Wei {
        self.balances.lock().unwrap().get(&addr(address)).copied().unwrap_or_default()
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> Vec<(Address, Address, Wei)> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl BalanceOracle for MockChain {
    async fn get_balance(&self, address: &Address) -> StationResult<Wei> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent requests interleave
        tokio::task::yield_now().await;
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(StationError::Network("connection refused".to_string()));
        }
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or_default())
    }
}

#[async_trait]
impl TransferSubmitter for MockChain {
    async fn submit_transfer(&self, funder: &KeyPair, to: &Address, amount: Wei) -> StationResult<TxHash> {
        tokio::task::yield_now().await;
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(StationError::Network("nonce too low".to_string()));
        }

        let mut transfers = self.transfers.lock().unwrap();
        transfers.push((funder.address(), *to, amount));
        let n = transfers.len() as u8;

        if self.credit_on_transfer.load(Ordering::SeqCst) {
            let mut balances = self.balances.lock().unwrap();
            balances.entry(*to).or_default().0 += amount.0;
            let funder_balance = balances.entry(funder.address()).or_default();
            funder_balance.0 = funder_balance.0.saturating_sub(amount.0);
        }

        Ok(TxHash([n; 32]))
    }
}

pub fn configured_identity() -> FunderIdentity {
    FunderIdentity::from_secret(Some(&FunderSecret::new(FUNDER_SECRET)))
}

pub fn policy() -> DispensePolicy {
    DispensePolicy {
        amount: GAS_AMOUNT,
        threshold: GAS_AMOUNT,
    }
}

pub fn dispenser_with(chain: &Arc<MockChain>, identity: FunderIdentity, pending_ttl: Duration) -> Dispenser {
    init_test_logging();
    Dispenser::new(
        identity,
        policy(),
        chain.clone(),
        chain.clone(),
        Arc::new(StationMetrics::new().expect("metrics")),
        pending_ttl,
    )
}

pub fn dispenser(chain: &Arc<MockChain>) -> Dispenser {
    dispenser_with(chain, configured_identity(), Duration::from_secs(120))
}
