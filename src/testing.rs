//! Scripted in-memory chain for unit tests.

use crate::chain::ChainClient;
use crate::topics::EventKind;
use crate::types::LogRecord;
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Token contract emitting every fake log.
pub const TOKEN: Address = Address::new([0x70; 20]);

pub struct FakeChain {
    head: AtomicU64,
    logs: Mutex<Vec<LogRecord>>,
    recipients: Mutex<HashMap<B256, Address>>,
    senders: Mutex<HashMap<B256, Address>>,
    requested: Mutex<Vec<(u64, u64)>>,
    fail_logs: AtomicU32,
    fail_head: AtomicU32,
    head_ok_limit: AtomicUsize,
    head_calls: AtomicUsize,
    recipient_calls: AtomicUsize,
}

impl FakeChain {
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            logs: Mutex::new(Vec::new()),
            recipients: Mutex::new(HashMap::new()),
            senders: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
            fail_logs: AtomicU32::new(0),
            fail_head: AtomicU32::new(0),
            head_ok_limit: AtomicUsize::new(usize::MAX),
            head_calls: AtomicUsize::new(0),
            recipient_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Add a Transfer log for `tx` in `block`. Logs must be pushed in block order.
    pub fn push_log(&self, block: u64, tx: B256) -> LogRecord {
        let mut logs = self.logs.lock().unwrap();
        let log = LogRecord {
            address: TOKEN,
            topics: vec![EventKind::Transfer.topic()],
            data: vec![0u8; 32],
            block_number: block,
            tx_hash: tx,
            log_index: logs.len() as u64,
        };
        logs.push(log.clone());
        log
    }

    pub fn set_recipient(&self, tx: B256, to: Address) {
        self.recipients.lock().unwrap().insert(tx, to);
    }

    pub fn set_sender(&self, tx: B256, from: Address) {
        self.senders.lock().unwrap().insert(tx, from);
    }

    pub fn fail_next_logs(&self, count: u32) {
        self.fail_logs.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_head(&self, count: u32) {
        self.fail_head.store(count, Ordering::SeqCst);
    }

    /// Answer the first `count` head requests, fail every later one.
    pub fn fail_head_after(&self, count: usize) {
        self.head_ok_limit.store(count, Ordering::SeqCst);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.requested.lock().unwrap().clone()
    }

    pub fn recipient_calls(&self) -> usize {
        self.recipient_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn top_block(&self) -> Result<u64> {
        let call = self.head_calls.fetch_add(1, Ordering::SeqCst);
        let lost = call >= self.head_ok_limit.load(Ordering::SeqCst);
        if lost || Self::take_failure(&self.fail_head) {
            anyhow::bail!("head unavailable");
        }
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(&self, topics: &[B256], from: u64, to: u64) -> Result<Vec<LogRecord>> {
        self.requested.lock().unwrap().push((from, to));
        if Self::take_failure(&self.fail_logs) {
            anyhow::bail!("connection reset");
        }
        let logs = self.logs.lock().unwrap();
        Ok(logs
            .iter()
            .filter(|l| (from..=to).contains(&l.block_number))
            .filter(|l| l.topic0().map_or(false, |t| topics.contains(t)))
            .cloned()
            .collect())
    }

    async fn trx_recipient(&self, tx: B256) -> Result<Address> {
        self.recipient_calls.fetch_add(1, Ordering::SeqCst);
        match self.recipients.lock().unwrap().get(&tx) {
            Some(to) => Ok(*to),
            None => anyhow::bail!("transaction 0x{:x} not found", tx),
        }
    }

    async fn trx_sender(&self, tx: B256) -> Result<Address> {
        match self.senders.lock().unwrap().get(&tx) {
            Some(from) => Ok(*from),
            None => anyhow::bail!("transaction 0x{:x} not found", tx),
        }
    }

    async fn block_time(&self, number: u64) -> Result<u64> {
        Ok(1_700_000_000 + number * 12)
    }
}
