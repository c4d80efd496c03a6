//! logpump - ERC20 event log pump
//!
//! Scans an Ethereum node for ERC20 event logs in bounded block windows,
//! resolves the recipient of each log's transaction and streams the logs
//! whose transaction was sent to a single watched contract.

pub mod cache;
pub mod chain;
pub mod config;
pub mod fetcher;
pub mod filter;
pub mod puller;
pub mod rpc;
pub mod summary;
pub mod topics;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export the main types for convenience
pub use cache::MemCache;
pub use chain::ChainClient;
pub use config::Config;
pub use puller::{LogPuller, PullerHandle, StopSignal};
pub use rpc::RpcClient;
pub use types::LogRecord;
