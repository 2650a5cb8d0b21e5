// crates/sealwatch-cli/src/blocks.rs

//! Block production timing monitor
//!
//! Prints each block's producer and the time distance to its parent,
//! advancing as the chain grows.

use {
    anyhow::{Context, Result},
    clap::Parser,
    sealwatch_chain::{ChainClient, HttpChainClient},
    sealwatch_common::{
        config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_RPC_URL, ENV_RPC_URL},
        types::{BlockNumber, RangeSpec},
        utils::format_timestamp,
    },
    sealwatch_core::CancelFlag,
    std::time::Duration,
    tokio::time::sleep,
    tracing::{debug, info, warn},
    tracing_subscriber::EnvFilter,
};

#[derive(Parser, Debug)]
#[clap(version, about = "Show block production times for an epoch-based PoS chain")]
struct Args {
    /// Start block; negative values are relative to the current head. Default: -100
    #[clap(long, allow_hyphen_values = true)]
    start_block: Option<i64>,

    /// End block. Default: open-ended
    #[clap(long)]
    end_block: Option<BlockNumber>,

    /// Chain RPC endpoint; falls back to $SEALWATCH_RPC_URL
    #[clap(long)]
    rpc_url: Option<String>,

    /// Milliseconds between head polls
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    #[clap(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(args.log_level.clone().unwrap_or_else(|| "info".to_string()))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let rpc_url = args
        .rpc_url
        .clone()
        .or_else(|| std::env::var(ENV_RPC_URL).ok())
        .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
    info!("Connecting to {}", rpc_url);
    let client = HttpChainClient::new(rpc_url);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            if cancel.is_cancelled() {
                eprintln!("Forced exit");
                std::process::exit(130);
            }
            eprintln!("Caught interrupt signal, finishing current block");
            cancel.cancel();
        })
        .context("Failed to install interrupt handler")?;
    }

    let interval = Duration::from_millis(args.poll_interval_ms);
    let spec = RangeSpec { start: args.start_block, end: args.end_block };
    let head = loop {
        if !spec.needs_head() {
            break 0;
        }
        if cancel.is_cancelled() {
            return Ok(());
        }
        match client.current_height().await {
            Ok(head) => break head,
            Err(e) if e.is_transient() => {
                warn!("height fetch failed, retrying: {}", e);
                sleep(interval).await;
            }
            Err(e) => return Err(anyhow::Error::new(e).context("failed to fetch chain height")),
        }
    };

    let range = spec.resolve(head);
    info!("watching blocks {} through {}", range.start, range.end);

    let mut prev_timestamp: Option<i64> = None;
    let mut block = range.start;
    'scan: while block <= range.end {
        loop {
            if cancel.is_cancelled() {
                break 'scan;
            }
            match client.current_height().await {
                Ok(head) if head >= block => break,
                Ok(head) => debug!("head at {}, waiting for block {}", head, block),
                Err(e) if e.is_transient() => warn!("height fetch failed, retrying: {}", e),
                Err(e) => {
                    return Err(anyhow::Error::new(e).context("failed to fetch chain height"))
                }
            }
            sleep(interval).await;
        }

        let current = loop {
            if cancel.is_cancelled() {
                break 'scan;
            }
            match client.get_block(block).await {
                Ok(info) => break info,
                Err(e) if e.is_transient() => {
                    warn!("block fetch failed, retrying: {}", e);
                    sleep(interval).await;
                }
                Err(e) => {
                    return Err(
                        anyhow::Error::new(e).context(format!("failed to fetch block {}", block))
                    )
                }
            }
        };

        if prev_timestamp.is_none() && block > 0 {
            let parent = loop {
                if cancel.is_cancelled() {
                    break 'scan;
                }
                match client.get_block(block - 1).await {
                    Ok(info) => break info,
                    Err(e) if e.is_transient() => {
                        warn!("block fetch failed, retrying: {}", e);
                        sleep(interval).await;
                    }
                    Err(e) => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("failed to fetch block {}", block - 1)))
                    }
                }
            };
            prev_timestamp = Some(parent.timestamp);
        }

        match prev_timestamp {
            Some(parent_ts) => println!(
                "{} miner {} time {} diff {}s",
                block,
                current.miner,
                format_timestamp(current.timestamp),
                current.timestamp - parent_ts
            ),
            None => println!(
                "{} miner {} time {}",
                block,
                current.miner,
                format_timestamp(current.timestamp)
            ),
        }
        prev_timestamp = Some(current.timestamp);
        block += 1;
    }

    info!("Block watch finished");
    Ok(())
}
