//! Transaction detail cache
//!
//! In-memory memoization of per-transaction and per-block lookups so the
//! scanner and its consumer do not repeat RPC calls for the same hash.
//!
//! Strategy:
//! - A successful lookup is cached forever (mined transactions don't change)
//! - A zero address from a contract creation is a success and is cached too
//! - Errors are never cached, the next call asks the fallback again

use alloy_primitives::{Address, B256};
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

/// A single memo table.
///
/// The lock is only held for the map access, never across the fallback call,
/// so the table can be shared between tasks.
struct Memo<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash + Copy, V: Copy> Memo<K, V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).copied()
    }

    fn insert(&self, key: K, value: V) {
        self.lock().insert(key, value);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, V>> {
        // a poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn resolve<F, Fut>(&self, key: K, fallback: F) -> Result<V>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = fallback(key).await?;
        self.insert(key, value);
        Ok(value)
    }
}

/// Cache for transaction recipients, senders and block timestamps.
pub struct MemCache {
    recipients: Memo<B256, Address>,
    senders: Memo<B256, Address>,
    block_times: Memo<u64, u64>,
}

impl MemCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            recipients: Memo::new(),
            senders: Memo::new(),
            block_times: Memo::new(),
        }
    }

    /// Recipient of the given transaction.
    ///
    /// Returns the cached value if known, otherwise asks `fallback`
    /// and remembers a successful answer.
    pub async fn trx_recipient<F, Fut>(&self, tx: B256, fallback: F) -> Result<Address>
    where
        F: FnOnce(B256) -> Fut,
        Fut: Future<Output = Result<Address>>,
    {
        self.recipients.resolve(tx, fallback).await
    }

    /// Sender of the given transaction, memoized like [`Self::trx_recipient`].
    pub async fn trx_sender<F, Fut>(&self, tx: B256, fallback: F) -> Result<Address>
    where
        F: FnOnce(B256) -> Fut,
        Fut: Future<Output = Result<Address>>,
    {
        self.senders.resolve(tx, fallback).await
    }

    /// Timestamp of the given block, memoized like [`Self::trx_recipient`].
    pub async fn block_time<F, Fut>(&self, number: u64, fallback: F) -> Result<u64>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        self.block_times.resolve(number, fallback).await
    }

    /// Number of cached recipients.
    pub fn recipients_len(&self) -> usize {
        self.recipients.len()
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}
