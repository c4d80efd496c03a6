//! Watched contract filter
//!
//! Forwards a log record only if the transaction that emitted it was sent
//! to the watched contract. Recipients are resolved cache-first.

use crate::cache::MemCache;
use crate::chain::ChainClient;
use crate::types::LogRecord;
use alloy_primitives::Address;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Recipient equality filter.
pub struct MatchFilter<C> {
    client: Arc<C>,
    cache: Arc<MemCache>,
    contract: Address,
}

impl<C: ChainClient> MatchFilter<C> {
    pub fn new(client: Arc<C>, cache: Arc<MemCache>, contract: Address) -> Self {
        Self {
            client,
            cache,
            contract,
        }
    }

    /// The watched contract address.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Check whether the record's transaction targets the watched contract.
    ///
    /// A failed recipient lookup counts as no match.
    pub async fn matches(&self, record: &LogRecord) -> bool {
        let client = &self.client;
        let recipient = match self
            .cache
            .trx_recipient(record.tx_hash, |tx| client.trx_recipient(tx))
            .await
        {
            Ok(rc) => rc,
            Err(e) => {
                warn!(tx = %record.tx_hash, "Recipient not available: {:#}", e);
                return false;
            }
        };

        // contract creation resolves to the zero address and never matches
        if recipient != self.contract {
            debug!(tx = %record.tx_hash, recipient = %recipient, "Skipping log");
            return false;
        }
        true
    }

    /// Push the record to `output` if it matches.
    ///
    /// Waits for room when the stream is full. Fails only when the
    /// consumer has gone away.
    pub async fn process(&self, record: LogRecord, output: &mpsc::Sender<LogRecord>) -> Result<()> {
        if !self.matches(&record).await {
            return Ok(());
        }

        info!(contract = %self.contract, tx = %record.tx_hash, block = record.block_number, "Match");
        output
            .send(record)
            .await
            .map_err(|_| anyhow::anyhow!("Output stream closed by consumer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChain;
    use alloy_primitives::{address, B256};

    const WATCHED: Address = Address::new([0xcc; 20]);

    fn filter(chain: &Arc<FakeChain>) -> MatchFilter<FakeChain> {
        MatchFilter::new(chain.clone(), Arc::new(MemCache::new()), WATCHED)
    }

    #[tokio::test]
    async fn test_match_emitted_other_dropped() {
        let chain = Arc::new(FakeChain::new(10));
        let hit = chain.push_log(1, B256::from([1u8; 32]));
        let miss = chain.push_log(1, B256::from([2u8; 32]));
        chain.set_recipient(hit.tx_hash, WATCHED);
        chain.set_recipient(
            miss.tx_hash,
            address!("00000000000000000000000000000000000000ff"),
        );

        let filter = filter(&chain);
        let (tx, mut rx) = mpsc::channel(4);
        filter.process(hit.clone(), &tx).await.unwrap();
        filter.process(miss, &tx).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(hit));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_unresolved_recipient_dropped() {
        let chain = Arc::new(FakeChain::new(10));
        let log = chain.push_log(1, B256::from([3u8; 32]));

        let filter = filter(&chain);
        assert!(!filter.matches(&log).await);
    }

    #[tokio::test]
    async fn test_contract_creation_dropped() {
        let chain = Arc::new(FakeChain::new(10));
        let log = chain.push_log(1, B256::from([4u8; 32]));
        chain.set_recipient(log.tx_hash, Address::ZERO);

        let filter = filter(&chain);
        assert!(!filter.matches(&log).await);
    }

    #[tokio::test]
    async fn test_recipient_lookup_memoized() {
        let chain = Arc::new(FakeChain::new(10));
        let tx = B256::from([5u8; 32]);
        let first = chain.push_log(1, tx);
        let second = chain.push_log(1, tx);
        chain.set_recipient(tx, WATCHED);

        let filter = filter(&chain);
        assert!(filter.matches(&first).await);
        assert!(filter.matches(&second).await);
        assert_eq!(chain.recipient_calls(), 1);
    }

    #[tokio::test]
    async fn test_closed_output_is_an_error() {
        let chain = Arc::new(FakeChain::new(10));
        let log = chain.push_log(1, B256::from([6u8; 32]));
        chain.set_recipient(log.tx_hash, WATCHED);

        let filter = filter(&chain);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(filter.process(log, &tx).await.is_err());
    }
}
