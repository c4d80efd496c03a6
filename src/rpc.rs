//! JSON-RPC client for Ethereum nodes
//!
//! Provides a typed interface to Ethereum JSON-RPC endpoints and implements
//! [`ChainClient`] on top of it.

use crate::chain::ChainClient;
use crate::types::{parse_hex_u64, BlockHeader, LogRecord, Transaction};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client without touching the network.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Create a client and make sure the node answers.
    ///
    /// Fails if the endpoint is unreachable or does not speak JSON-RPC.
    pub async fn connect(url: String) -> Result<Self> {
        let rpc = Self::new(url);
        let chain_id = rpc
            .chain_id()
            .await
            .with_context(|| format!("Can not connect node at {}", rpc.url))?;
        info!(url = %rpc.url, chain_id, "Node connected");
        Ok(rpc)
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let json: Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        // Check for RPC error
        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error: {}", error);
        }

        json.get("result")
            .cloned()
            .context("RPC response missing 'result' field")
    }

    /// Parse a quantity result (`"0x..."`) into u64.
    fn quantity(result: &Value, what: &str) -> Result<u64> {
        let s = result
            .as_str()
            .with_context(|| format!("{} response is not a string", what))?;
        parse_hex_u64(s).with_context(|| format!("Failed to parse {}", what))
    }

    /// Get the chain id of the connected node.
    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        Self::quantity(&result, "chain id")
    }

    /// Get a transaction by hash.
    pub async fn get_transaction(&self, tx_hash: B256) -> Result<Transaction> {
        let params = json!([format!("0x{:x}", tx_hash)]);
        let result = self.call("eth_getTransactionByHash", params).await?;
        if result.is_null() {
            anyhow::bail!("Transaction 0x{:x} not found", tx_hash);
        }
        serde_json::from_value(result).context("Failed to deserialize transaction")
    }

    /// Get a block header (without transactions) by number.
    pub async fn get_block_header(&self, number: u64) -> Result<BlockHeader> {
        let params = json!([format!("0x{:x}", number), false]);
        let result = self.call("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            anyhow::bail!("Block {} not found", number);
        }
        serde_json::from_value(result).context("Failed to deserialize block")
    }
}

/// Build `eth_getLogs` filter params: a single topic0 position matching any of `topics`.
fn logs_filter(topics: &[B256], from: u64, to: u64) -> Value {
    let topic0: Vec<String> = topics.iter().map(|t| format!("0x{:x}", t)).collect();
    json!([{
        "fromBlock": format!("0x{:x}", from),
        "toBlock": format!("0x{:x}", to),
        "topics": [topic0],
    }])
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn top_block(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        Self::quantity(&result, "block number")
    }

    async fn get_logs(&self, topics: &[B256], from: u64, to: u64) -> Result<Vec<LogRecord>> {
        let result = self.call("eth_getLogs", logs_filter(topics, from, to)).await?;
        let logs: Vec<LogRecord> =
            serde_json::from_value(result).context("Failed to deserialize logs")?;
        debug!(from, to, count = logs.len(), "Pulled logs");
        Ok(logs)
    }

    async fn trx_recipient(&self, tx: B256) -> Result<Address> {
        let trx = self.get_transaction(tx).await?;
        if trx.is_contract_creation() {
            info!(tx = %trx.hash, "Contract deployment");
        }
        Ok(trx.recipient())
    }

    async fn trx_sender(&self, tx: B256) -> Result<Address> {
        Ok(self.get_transaction(tx).await?.from)
    }

    async fn block_time(&self, number: u64) -> Result<u64> {
        Ok(self.get_block_header(number).await?.timestamp)
    }
}
