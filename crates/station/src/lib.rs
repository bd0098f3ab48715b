//! Gas station service: tops up wallets that cannot pay for gas.
//!
//! A single funder account sends a small fixed amount of native currency to
//! any well-formed address whose balance is below a threshold:
//! - Funder identity derived from a configured secret
//! - Balance lookups and transfer broadcast through an EVM JSON-RPC node
//! - HTTP API for dispensing and funder status
//! - Prometheus metrics

pub mod api;
pub mod config;
pub mod dispenser;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod oracle;
pub mod rpc;

pub use config::{DispenseSettings, FunderSecret, StationConfig};
pub use dispenser::{DispensePolicy, DispenseResult, Dispenser, FunderStatus};
pub use error::{Rejection, StationError, StationResult};
pub use identity::FunderIdentity;
pub use metrics::StationMetrics;
pub use oracle::{BalanceOracle, TransferSubmitter};
pub use rpc::RpcChainClient;
