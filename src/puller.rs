//! Log puller service
//!
//! Runs the scan loop on a background task: keeps the chain head fresh,
//! pulls log windows from the cursor up to the head, and pushes the records
//! whose transaction targets the watched contract into a bounded stream.
//!
//! The task owns all scan state. The owning process only holds a
//! [`PullerHandle`] to read the stream and request termination; the task
//! itself is placed on the caller's [`JoinSet`] so shutdown can be awaited.

use crate::cache::MemCache;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::fetcher::WindowFetcher;
use crate::filter::MatchFilter;
use crate::topics::TopicSet;
use crate::types::LogRecord;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Scan loop state, moved into the worker task on [`LogPuller::run`].
pub struct LogPuller<C> {
    client: Arc<C>,
    fetcher: WindowFetcher<C>,
    filter: MatchFilter<C>,
    current_block: u64,
    top_block: u64,
    head_interval: Duration,
    status_interval: Duration,
    buffer_capacity: usize,
}

/// Control surface of a running puller.
pub struct PullerHandle {
    output: mpsc::Receiver<LogRecord>,
    stop: StopSignal,
}

/// Cloneable stop request sender.
///
/// The signal has room for a single pending request. A second request made
/// before the worker saw the first waits until the worker drains it or
/// terminates; it never waits forever.
#[derive(Clone)]
pub struct StopSignal {
    tx: mpsc::Sender<()>,
}

impl StopSignal {
    /// Ask the worker to terminate at its next iteration boundary.
    ///
    /// Does not wait for termination.
    pub async fn stop(&self) {
        // an error means the worker is already gone
        let _ = self.tx.send(()).await;
    }
}

impl PullerHandle {
    /// Next matched record, `None` once the worker terminated.
    pub async fn recv(&mut self) -> Option<LogRecord> {
        self.output.recv().await
    }

    /// Request termination. See [`StopSignal::stop`].
    pub async fn stop(&self) {
        self.stop.stop().await
    }

    /// Split into the output stream and the stop signal.
    pub fn into_parts(self) -> (mpsc::Receiver<LogRecord>, StopSignal) {
        (self.output, self.stop)
    }
}

impl<C: ChainClient + 'static> LogPuller<C> {
    /// Create a puller scanning from `config.start_block` for the registered topics.
    pub fn new(config: &Config, client: Arc<C>, cache: Arc<MemCache>) -> Self {
        Self {
            fetcher: WindowFetcher::new(client.clone(), TopicSet::registered(), config.window_size),
            filter: MatchFilter::new(client.clone(), cache, config.scan_contract),
            client,
            current_block: config.start_block,
            top_block: 0,
            head_interval: config.head_interval(),
            status_interval: config.status_interval(),
            buffer_capacity: config.buffer_capacity.max(1),
        }
    }

    /// Spawn the worker on `tasks` and hand back its control surface.
    pub fn run(self, tasks: &mut JoinSet<()>) -> PullerHandle {
        let (out_tx, out_rx) = mpsc::channel(self.buffer_capacity);
        let (stop_tx, stop_rx) = mpsc::channel(1);

        info!(
            start = self.current_block,
            contract = %self.filter.contract(),
            "Starting log puller"
        );
        tasks.spawn(self.scan(stop_rx, out_tx));

        PullerHandle {
            output: out_rx,
            stop: StopSignal { tx: stop_tx },
        }
    }

    /// The scan loop.
    ///
    /// Each iteration waits for the stop signal, a timer, a backoff deadline
    /// or pending work, whichever comes first, then does one unit of work:
    /// process one buffered record, or pull the next window.
    async fn scan(mut self, mut sig_stop: mpsc::Receiver<()>, output: mpsc::Sender<LogRecord>) {
        let mut head_tick = interval(self.head_interval);
        head_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut info_tick = interval(self.status_interval);
        info_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut logs: VecDeque<LogRecord> = VecDeque::new();
        loop {
            let now = Instant::now();
            let busy = !logs.is_empty() || self.can_fetch(now);
            let backoff_until = self
                .fetcher
                .retry_at()
                .filter(|at| *at > now && logs.is_empty() && self.has_range());

            tokio::select! {
                biased;
                // a dropped handle counts as a stop request
                _ = sig_stop.recv() => break,
                _ = head_tick.tick() => self.fetch_head().await,
                _ = info_tick.tick() => {
                    info!(current = self.current_block, head = self.top_block, "Scanner status");
                }
                _ = sleep_until(backoff_until.unwrap_or(now)), if backoff_until.is_some() => {}
                _ = std::future::ready(()), if busy => {}
            }

            match logs.pop_front() {
                Some(record) => {
                    if let Err(e) = self.filter.process(record, &output).await {
                        warn!("{:#}", e);
                        break;
                    }
                }
                None => {
                    if self.can_fetch(Instant::now()) {
                        logs = self.next_logs().await.into();
                    }
                }
            }
        }

        // closes the output stream
        drop(output);
        info!(current = self.current_block, "Log puller terminated");
    }

    /// Whether the cursor has not yet passed the known head.
    fn has_range(&self) -> bool {
        self.current_block <= self.top_block
    }

    fn can_fetch(&self, now: Instant) -> bool {
        self.has_range() && self.fetcher.is_ready(now)
    }

    /// Update the known head block. Errors leave the previous value in place.
    async fn fetch_head(&mut self) {
        match self.client.top_block().await {
            Ok(top) => self.top_block = top,
            Err(e) => warn!(head = self.top_block, "Error pulling the current head: {:#}", e),
        }
    }

    /// Pull the next window and advance the cursor on success.
    async fn next_logs(&mut self) -> Vec<LogRecord> {
        let (logs, next) = self
            .fetcher
            .next_batch(self.current_block, self.top_block)
            .await;
        debug_assert!(next >= self.current_block);
        self.current_block = next;
        logs
    }
}
