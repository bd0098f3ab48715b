//! Gas dispensing decision procedure

use crate::config::DispenseSettings;
use crate::error::{Rejection, StationError, StationResult};
use crate::identity::FunderIdentity;
use crate::metrics::StationMetrics;
use crate::oracle::{BalanceOracle, TransferSubmitter};
use gas_common::types::{Address, TxHash, Wei};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Upper bound on targets tracked while their transfers land
const MAX_PENDING_TARGETS: u64 = 10_000;

/// Fixed amounts governing a dispense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispensePolicy {
    /// Sent per successful dispense
    pub amount: Wei,
    /// Targets at or above this balance are already funded
    pub threshold: Wei,
}

impl From<&DispenseSettings> for DispensePolicy {
    fn from(settings: &DispenseSettings) -> Self {
        Self {
            amount: settings.amount,
            threshold: settings.threshold,
        }
    }
}

/// Outcome of one dispense request.
///
/// `Sent` means the node accepted the transfer for broadcast. It is not a
/// settlement guarantee: the transaction may still be dropped or replaced.
#[derive(Debug)]
pub enum DispenseResult {
    Sent { amount: Wei, tx_hash: TxHash },
    Rejected(Rejection),
    Failed(StationError),
}

/// Funder address and fresh balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunderStatus {
    pub address: Address,
    pub balance: Wei,
}

pub struct Dispenser {
    identity: FunderIdentity,
    policy: DispensePolicy,
    oracle: Arc<dyn BalanceOracle>,
    submitter: Arc<dyn TransferSubmitter>,
    metrics: Arc<StationMetrics>,
    // Serializes balance checks and submission so two requests can't both
    // pass against the same stale read, and the funder nonce has one writer.
    write_lock: Mutex<()>,
    // Targets whose transfer was broadcast but may not be reflected in balance yet.
    pending: Cache<Address, TxHash>,
}

impl Dispenser {
    pub fn new(
        identity: FunderIdentity,
        policy: DispensePolicy,
        oracle: Arc<dyn BalanceOracle>,
        submitter: Arc<dyn TransferSubmitter>,
        metrics: Arc<StationMetrics>,
        pending_ttl: Duration,
    ) -> Self {
        let pending = Cache::builder()
            .max_capacity(MAX_PENDING_TARGETS)
            .time_to_live(pending_ttl)
            .build();

        Self {
            identity,
            policy,
            oracle,
            submitter,
            metrics,
            write_lock: Mutex::new(()),
            pending,
        }
    }

    pub fn identity(&self) -> &FunderIdentity {
        &self.identity
    }

    pub fn metrics(&self) -> Arc<StationMetrics> {
        self.metrics.clone()
    }

    /// Send the fixed amount to `target` unless it is invalid or already funded.
    pub async fn dispense(&self, target: &str) -> DispenseResult {
        self.metrics.dispense_requests_total.inc();

        let result = match self.try_dispense(target).await {
            Ok(result) => result,
            Err(e) => DispenseResult::Failed(e),
        };

        match &result {
            DispenseResult::Sent { amount, tx_hash } => {
                self.metrics.dispense_sent_total.inc();
                info!("Dispensed {} ether to {}, tx: {}", amount.to_ether_string(), target, tx_hash);
            }
            DispenseResult::Rejected(rejection) => {
                self.metrics.dispense_rejected_total.inc();
                info!("Dispense to {} rejected: {}", target, rejection);
            }
            DispenseResult::Failed(e @ StationError::InsufficientFunderBalance { .. }) => {
                self.metrics.dispense_failed_total.inc();
                warn!("Dispense to {} failed, funder needs a top-up: {}", target, e);
            }
            DispenseResult::Failed(e) => {
                self.metrics.dispense_failed_total.inc();
                error!("Dispense to {} failed: {}", target, e);
            }
        }

        result
    }

    async fn try_dispense(&self, target: &str) -> StationResult<DispenseResult> {
        // 1. No funder, nothing to dispense
        let funder = self.identity.key()?;

        // 2. Validate address before touching the chain
        let address: Address = match target.parse() {
            Ok(address) => address,
            Err(e) => return Ok(DispenseResult::Rejected(Rejection::InvalidAddress(e.to_string()))),
        };
        if address.is_zero() {
            return Ok(DispenseResult::Rejected(Rejection::InvalidAddress(
                "zero address not allowed".to_string(),
            )));
        }
        if address == funder.address() {
            return Ok(DispenseResult::Rejected(Rejection::InvalidAddress(
                "cannot fund the funder address".to_string(),
            )));
        }

        let _guard = self.write_lock.lock().await;

        // 3. Already funded targets are a cheap no-op
        let balance = self.oracle.get_balance(&address).await?;
        if balance >= self.policy.threshold {
            return Ok(DispenseResult::Rejected(Rejection::AlreadyFunded { balance }));
        }
        if let Some(tx_hash) = self.pending.get(&address).await {
            debug!("Transfer {} to {} still pending", tx_hash, address);
            return Ok(DispenseResult::Rejected(Rejection::AlreadyFunded { balance }));
        }

        // 4. Funder must hold more than one dispense
        let funder_balance = self.read_funder_balance(&funder.address()).await?;
        if funder_balance <= self.policy.amount {
            return Err(StationError::InsufficientFunderBalance { balance: funder_balance });
        }

        // 5. Submit; success means accepted for broadcast
        let tx_hash = self
            .submitter
            .submit_transfer(funder, &address, self.policy.amount)
            .await?;
        self.pending.insert(address, tx_hash).await;

        Ok(DispenseResult::Sent {
            amount: self.policy.amount,
            tx_hash,
        })
    }

    async fn read_funder_balance(&self, address: &Address) -> StationResult<Wei> {
        let balance = self.oracle.get_balance(address).await?;
        self.metrics.funder_balance_wei.set(balance.0 as f64);
        Ok(balance)
    }

    /// Funder address and current balance
    pub async fn status(&self) -> StationResult<FunderStatus> {
        let address = self.identity.address()?;
        let balance = self.read_funder_balance(&address).await?;
        Ok(FunderStatus { address, balance })
    }
}
