//! Windowed log fetcher
//!
//! Pulls log records for the registered topics in bounded block windows.
//! The cursor only moves after the node answered for the whole window; an
//! empty answer still counts as scanned. Failed windows are retried as-is
//! after an exponential delay.

use crate::chain::ChainClient;
use crate::topics::TopicSet;
use crate::types::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Delay before the first retry of a failed window.
pub const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Upper bound of the retry delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Bounded block range puller.
pub struct WindowFetcher<C> {
    client: Arc<C>,
    topics: TopicSet,
    window_size: u64,
    failures: u32,
    retry_at: Option<Instant>,
}

impl<C: ChainClient> WindowFetcher<C> {
    /// Create a fetcher pulling at most `window_size` blocks per request.
    ///
    /// A zero window size is treated as one block.
    pub fn new(client: Arc<C>, topics: TopicSet, window_size: u64) -> Self {
        Self {
            client,
            topics,
            window_size: window_size.max(1),
            failures: 0,
            retry_at: None,
        }
    }

    /// The inclusive block range to pull next, if there is anything to pull.
    pub fn window(&self, current: u64, top: u64) -> Option<(u64, u64)> {
        if current > top {
            return None;
        }
        let target = current.saturating_add(self.window_size - 1).min(top);
        Some((current, target))
    }

    /// Pull the next batch of log records.
    ///
    /// Returns the records and the new cursor. The cursor is unchanged when
    /// there is nothing to pull or the node call failed.
    pub async fn next_batch(&mut self, current: u64, top: u64) -> (Vec<LogRecord>, u64) {
        let Some((from, to)) = self.window(current, top) else {
            return (Vec::new(), current);
        };

        match self.client.get_logs(self.topics.as_slice(), from, to).await {
            Ok(logs) => {
                self.failures = 0;
                self.retry_at = None;
                debug!(from, to, count = logs.len(), "Window scanned");
                (logs, to.saturating_add(1))
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                let delay = self.backoff();
                self.retry_at = Some(Instant::now() + delay);
                warn!(
                    from,
                    to,
                    failures = self.failures,
                    retry_in = ?delay,
                    "Failed to pull logs: {:#}",
                    e
                );
                (Vec::new(), current)
            }
        }
    }

    /// Delay imposed by the current run of consecutive failures.
    pub fn backoff(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        let exp = (self.failures - 1).min(16);
        BACKOFF_BASE.saturating_mul(1u32 << exp).min(BACKOFF_MAX)
    }

    /// Earliest instant the failed window may be retried, if backing off.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Whether a fetch may be attempted at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.retry_at.map_or(true, |at| now >= at)
    }

    #[cfg(test)]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
