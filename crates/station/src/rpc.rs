//! JSON-RPC client for an EVM node

use crate::config::DispenseSettings;
use crate::error::{StationError, StationResult};
use crate::oracle::{BalanceOracle, TransferSubmitter};
use async_trait::async_trait;
use gas_common::types::{Address, TxHash, Wei};
use gas_crypto::{KeyPair, LegacyTransaction};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// RPC client for interacting with blockchain
pub struct RpcChainClient {
    rpc_url: String,
    client: reqwest::Client,
    chain_id: Option<u64>,
    gas_price: Option<u128>,
    gas_limit: u64,
    next_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(rpc_url: impl Into<String>, settings: &DispenseSettings, timeout: Duration) -> StationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StationError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            rpc_url: rpc_url.into(),
            client,
            chain_id: settings.chain_id,
            gas_price: settings.gas_price,
            gas_limit: settings.gas_limit,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> StationResult<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed)
        });

        debug!("RPC call: {}", method);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StationError::Network(format!("{} request failed: {}", method, e)))?;

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| StationError::Network(format!("{} returned invalid response: {}", method, e)))?;

        if let Some(error) = body.get("error") {
            return Err(StationError::Network(format!("{} failed: {}", method, error)));
        }

        match body.get_mut("result").map(Value::take) {
            Some(Value::Null) | None => Err(StationError::Network(format!("{} returned no result", method))),
            Some(result) => Ok(result),
        }
    }

    async fn call_quantity(&self, method: &str, params: Value) -> StationResult<u128> {
        let result = self.call(method, params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| StationError::Network(format!("{} returned non-string quantity: {}", method, result)))?;
        Wei::from_hex_quantity(text)
            .map(|wei| wei.0)
            .map_err(|e| StationError::Network(format!("{} returned {}", method, e)))
    }

    async fn call_u64(&self, method: &str, params: Value) -> StationResult<u64> {
        let value = self.call_quantity(method, params).await?;
        u64::try_from(value).map_err(|_| StationError::Network(format!("{} returned out-of-range value {}", method, value)))
    }

    /// Nonce including transactions still in the node's pool
    pub async fn get_transaction_count(&self, address: &Address) -> StationResult<u64> {
        self.call_u64("eth_getTransactionCount", json!([address.to_hex(), "pending"]))
            .await
    }

    pub async fn get_chain_id(&self) -> StationResult<u64> {
        match self.chain_id {
            Some(id) => Ok(id),
            None => self.call_u64("eth_chainId", json!([])).await,
        }
    }

    pub async fn get_gas_price(&self) -> StationResult<u128> {
        match self.gas_price {
            Some(price) => Ok(price),
            None => self.call_quantity("eth_gasPrice", json!([])).await,
        }
    }

    pub async fn send_raw_transaction(&self, tx_data: &str) -> StationResult<TxHash> {
        let result = self.call("eth_sendRawTransaction", json!([tx_data])).await?;
        result
            .as_str()
            .ok_or_else(|| StationError::Network(format!("eth_sendRawTransaction returned {}", result)))?
            .parse()
            .map_err(|e| StationError::Network(format!("eth_sendRawTransaction returned bad hash: {}", e)))
    }
}

#[async_trait]
impl BalanceOracle for RpcChainClient {
    async fn get_balance(&self, address: &Address) -> StationResult<Wei> {
        self.call_quantity("eth_getBalance", json!([address.to_hex(), "latest"]))
            .await
            .map(Wei)
    }
}

#[async_trait]
impl TransferSubmitter for RpcChainClient {
    async fn submit_transfer(&self, funder: &KeyPair, to: &Address, amount: Wei) -> StationResult<TxHash> {
        let nonce = self.get_transaction_count(&funder.address()).await?;
        let chain_id = self.get_chain_id().await?;
        let gas_price = self.get_gas_price().await?;

        let tx = LegacyTransaction::transfer(nonce, gas_price, self.gas_limit, *to, amount, chain_id);
        let signed = tx.sign(funder)?;

        let tx_hash = self.send_raw_transaction(&signed.raw_hex()).await?;
        if tx_hash != signed.hash {
            debug!("Node reported hash {} for locally computed {}", tx_hash, signed.hash);
        }

        info!("Transaction sent: {} (nonce {}, chain {})", tx_hash, nonce, chain_id);
        Ok(tx_hash)
    }
}
