//! Scanner configuration
//!
//! Loads the scanner settings from a JSON file. Only the node endpoint,
//! the start block and the watched contract are required; the loop
//! tunables fall back to defaults.
//!
//! # Example file:
//! ```json
//! {
//!   "rpc_url": "http://127.0.0.1:8545",
//!   "start_block": 1000,
//!   "scan_contract": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
//!   "window_size": 5
//! }
//! ```

use crate::types::pad_hex_string;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Maximal number of blocks pulled in one `eth_getLogs` call.
pub const DEFAULT_WINDOW_SIZE: u64 = 5;

/// Capacity of the matched log output stream.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

pub const DEFAULT_HEAD_INTERVAL_MS: u64 = 500;
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 5_000;

/// Scanner settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Node JSON-RPC endpoint
    pub rpc_url: String,

    /// First block to scan
    pub start_block: u64,

    /// Contract whose transactions we are interested in
    #[serde(deserialize_with = "deserialize_address")]
    pub scan_contract: Address,

    #[serde(default = "default_window_size")]
    pub window_size: u64,

    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// How often the chain head is refreshed
    #[serde(default = "default_head_interval_ms")]
    pub head_interval_ms: u64,

    /// How often the scan progress is logged
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

fn default_window_size() -> u64 {
    DEFAULT_WINDOW_SIZE
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_head_interval_ms() -> u64 {
    DEFAULT_HEAD_INTERVAL_MS
}

fn default_status_interval_ms() -> u64 {
    DEFAULT_STATUS_INTERVAL_MS
}

impl Config {
    /// Config with default tunables.
    pub fn new(rpc_url: String, start_block: u64, scan_contract: Address) -> Self {
        Self {
            rpc_url,
            start_block,
            scan_contract,
            window_size: DEFAULT_WINDOW_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            head_interval_ms: DEFAULT_HEAD_INTERVAL_MS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
        }
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the tunables are usable.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            anyhow::bail!("Node endpoint must not be empty");
        }
        if self.window_size == 0 {
            anyhow::bail!("Window size must be greater than 0");
        }
        if self.buffer_capacity == 0 {
            anyhow::bail!("Buffer capacity must be greater than 0");
        }
        if self.head_interval_ms == 0 || self.status_interval_ms == 0 {
            anyhow::bail!("Timer intervals must be greater than 0");
        }
        Ok(())
    }

    pub fn head_interval(&self) -> Duration {
        Duration::from_millis(self.head_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }

    Ok(Address::from_slice(&bytes))
}

fn deserialize_address<'de, D>(deserializer: D) -> std::result::Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_address(&s).map_err(serde::de::Error::custom)
}
