//! Chain client seam
//!
//! The scanner never talks to a node directly. Everything it needs from the
//! chain goes through [`ChainClient`], implemented for JSON-RPC nodes by
//! [`crate::rpc::RpcClient`] and by scripted fakes in tests.

use crate::types::LogRecord;
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;

/// Read access to a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Number of the current head block.
    async fn top_block(&self) -> Result<u64>;

    /// Logs whose topic0 is one of `topics`, emitted in blocks `from..=to`.
    async fn get_logs(&self, topics: &[B256], from: u64, to: u64) -> Result<Vec<LogRecord>>;

    /// Recipient of a transaction. Contract creation yields the zero address.
    async fn trx_recipient(&self, tx: B256) -> Result<Address>;

    /// Sender of a transaction.
    async fn trx_sender(&self, tx: B256) -> Result<Address>;

    /// Timestamp (Unix seconds) of a block.
    async fn block_time(&self, number: u64) -> Result<u64>;
}
