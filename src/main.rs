//! ERC20 log pump binary
//!
//! Scans the chain for ERC20 event logs of transactions sent to the watched
//! contract and prints one JSON line per match on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use logpump::config::{parse_address, Config};
use logpump::summary::summarize;
use logpump::{LogPuller, LogRecord, MemCache, RpcClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// ERC20 log pump
#[derive(Parser)]
#[command(name = "logpump")]
#[command(about = "Stream ERC20 event logs of transactions sent to a watched contract")]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RPC endpoint URL, overrides the config file
    #[arg(short, long)]
    rpc_url: Option<String>,

    /// First block to scan, overrides the config file
    #[arg(short, long)]
    start_block: Option<u64>,

    /// Watched contract address, overrides the config file
    #[arg(long)]
    contract: Option<String>,
}

impl Args {
    /// Merge the config file (if any) with command line overrides.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                let contract = self
                    .contract
                    .as_deref()
                    .context("Either --config or --contract is required")?;
                Config::new(
                    "http://127.0.0.1:8545".to_string(),
                    0,
                    parse_address(contract)?,
                )
            }
        };

        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(start) = self.start_block {
            config.start_block = start;
        }
        if let Some(contract) = &self.contract {
            config.scan_contract = parse_address(contract)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Print the summary of a matched record as a JSON line.
async fn emit(rpc: &RpcClient, cache: &MemCache, record: &LogRecord) {
    match summarize(rpc, cache, record).await {
        Ok(summary) => match serde_json::to_string(&summary) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to encode summary: {}", e),
        },
        Err(e) => warn!(tx = %record.tx_hash, "Skipping match: {:#}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the matches
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve_config().context("Invalid configuration")?;

    info!("Starting log pump");
    info!("RPC URL: {}", config.rpc_url);
    info!("Contract: {:?}", config.scan_contract);
    info!("Start block: {}", config.start_block);

    let rpc = Arc::new(
        RpcClient::connect(config.rpc_url.clone())
            .await
            .context("Failed to connect node")?,
    );
    let cache = Arc::new(MemCache::new());

    let mut tasks = JoinSet::new();
    let mut puller = LogPuller::new(&config, rpc.clone(), cache.clone()).run(&mut tasks);

    // Handle Ctrl+C gracefully
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            record = puller.recv() => match record {
                Some(record) => emit(&rpc, &cache, &record).await,
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down gracefully...");
                puller.stop().await;
                break;
            }
        }
    }

    // Matches already in the stream are still reported
    while let Some(record) = puller.recv().await {
        emit(&rpc, &cache, &record).await;
    }
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!("Log puller task failed: {}", e);
        }
    }

    info!("Log pump stopped");
    Ok(())
}
