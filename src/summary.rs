//! Matched transaction summaries
//!
//! Turns a matched log record into a flat description of the transaction
//! behind it (sender, recipient, block time). Log data is left undecoded.

use crate::cache::MemCache;
use crate::chain::ChainClient;
use crate::topics::EventKind;
use crate::types::LogRecord;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::Serialize;

/// One matched log with its transaction context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub hash: B256,
    pub block_number: u64,
    /// Block timestamp (Unix epoch seconds)
    pub timestamp: u64,
    pub from: Address,
    pub to: Address,
    /// Contract that emitted the log
    pub emitter: Address,
    pub log_index: u64,
    /// Registered event name, if topic0 is known
    pub event: Option<&'static str>,
}

/// Build the summary of a matched record, resolving through the cache.
pub async fn summarize<C: ChainClient>(
    client: &C,
    cache: &MemCache,
    record: &LogRecord,
) -> Result<TransactionSummary> {
    let hash = record.tx_hash;
    let from = cache
        .trx_sender(hash, |tx| client.trx_sender(tx))
        .await
        .with_context(|| format!("Failed to get sender of 0x{:x}", hash))?;
    let to = cache
        .trx_recipient(hash, |tx| client.trx_recipient(tx))
        .await
        .with_context(|| format!("Failed to get recipient of 0x{:x}", hash))?;
    let timestamp = cache
        .block_time(record.block_number, |n| client.block_time(n))
        .await
        .with_context(|| format!("Failed to get time of block {}", record.block_number))?;

    Ok(TransactionSummary {
        hash,
        block_number: record.block_number,
        timestamp,
        from,
        to,
        emitter: record.address,
        log_index: record.log_index,
        event: record.topic0().and_then(EventKind::from_topic).map(EventKind::name),
    })
}
