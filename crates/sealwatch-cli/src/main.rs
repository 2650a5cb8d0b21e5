// crates/sealwatch-cli/src/main.rs

use {
    anyhow::{Context, Result},
    clap::Parser,
    sealwatch_chain::{ChainClient, HttpChainClient},
    sealwatch_common::{
        config::{MonitorConfig, ProducerOverride, ENV_RPC_URL},
        types::RangeSpec,
    },
    sealwatch_core::{
        BlockScanPoller, CancelFlag, DowntimeTracker, PollerConfig, ScanOutcome,
    },
    std::{path::PathBuf, sync::Arc, time::Duration},
    tokio::{
        sync::{mpsc, RwLock},
        time::interval,
    },
    tracing::info,
    tracing_subscriber::EnvFilter,
};

mod render;

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Show block-signing participation for an epoch-based PoS chain",
    long_about = "Scans a block range, decodes each block's aggregated-seal bitmap, and \
accumulates per-validator downtime statistics. Enter ctrl-c to stop and print the summary table."
)]
struct Args {
    /// JSON config file; flags override its values
    #[clap(long)]
    config: Option<PathBuf>,

    /// Start block; negative values are relative to the current head. Default: -100
    #[clap(long, allow_hyphen_values = true)]
    start_block: Option<i64>,

    /// End block. Default: open-ended
    #[clap(long)]
    end_block: Option<u64>,

    /// Indicator for a signed block. Default: .
    #[clap(long)]
    signed_symbol: Option<String>,

    /// Indicator for a missed block. Default: X
    #[clap(long)]
    missed_symbol: Option<String>,

    /// Do not list missed validator addresses per block
    #[clap(long)]
    no_addresses: bool,

    /// Chain RPC endpoint; falls back to $SEALWATCH_RPC_URL
    #[clap(long)]
    rpc_url: Option<String>,

    /// Milliseconds between head polls
    #[clap(long)]
    poll_interval_ms: Option<u64>,

    /// Count a produced block as signed even when its own seal bit is zero
    #[clap(long)]
    count_producer_override: bool,

    /// Seconds between live summary log lines (0 disables)
    #[clap(long)]
    stats_interval_secs: Option<u64>,

    #[clap(long)]
    log_level: Option<String>,
}

impl Args {
    fn resolve_config(&self) -> Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => MonitorConfig::default(),
        };

        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        } else if let Ok(url) = std::env::var(ENV_RPC_URL) {
            config.rpc_url = url;
        }
        if self.start_block.is_some() {
            config.start_block = self.start_block;
        }
        if self.end_block.is_some() {
            config.end_block = self.end_block;
        }
        if let Some(symbol) = &self.signed_symbol {
            config.signed_symbol = symbol.clone();
        }
        if let Some(symbol) = &self.missed_symbol {
            config.missed_symbol = symbol.clone();
        }
        if self.no_addresses {
            config.show_addresses = false;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if self.count_producer_override {
            config.producer_override = ProducerOverride::Counters;
        }
        if let Some(secs) = self.stats_interval_secs {
            config.stats_interval_secs = secs;
        }
        Ok(config)
    }
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

    let config = args.resolve_config()?;
    info!("Connecting to {}", config.rpc_url);
    let client = HttpChainClient::new(config.rpc_url.clone());

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

    announce_range(&client, &config).await;

    let tracker = Arc::new(RwLock::new(DowntimeTracker::new(config.producer_override)));
    let (record_tx, record_rx) = mpsc::channel(64);
    let mut poller = BlockScanPoller::new(
        client.clone(),
        PollerConfig {
            range: RangeSpec { start: config.start_block, end: config.end_block },
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        },
        tracker.clone(),
        cancel.clone(),
    )
    .with_records(record_tx);

    let symbols = render::Symbols {
        signed: config.signed_symbol.clone(),
        missed: config.missed_symbol.clone(),
    };
    let render_task = tokio::spawn(render::print_records(
        record_rx,
        symbols,
        config.show_addresses,
    ));

    if config.stats_interval_secs > 0 {
        spawn_stats_task(tracker.clone(), config.stats_interval_secs);
    }

    let report = poller.run().await;
    drop(poller);
    let _ = render_task.await;

    render::print_snapshot(&client, &report).await;

    match report.outcome {
        ScanOutcome::Completed | ScanOutcome::Cancelled => Ok(()),
        ScanOutcome::Failed(e) => Err(anyhow::Error::new(e).context("scan aborted")),
    }
}

/// Log the resolved range with its epochs when both bounds are explicit.
async fn announce_range(client: &HttpChainClient, config: &MonitorConfig) {
    let explicit_start = config.start_block.filter(|s| *s >= 0);
    if let (Some(start), Some(end)) = (explicit_start, config.end_block) {
        let start = start as u64;
        if let (Ok(start_epoch), Ok(end_epoch)) =
            (client.epoch_of_block(start).await, client.epoch_of_block(end).await)
        {
            info!(
                "Starting at block {} (epoch {}), ending at {} (epoch {})",
                start, start_epoch, end, end_epoch
            );
        }
    }
}

/// Periodically log a one-line summary from the tracker's snapshot. Reads
/// only; the scan keeps exclusive write access.
fn spawn_stats_task(tracker: Arc<RwLock<DowntimeTracker>>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let snapshot = tracker.read().await.snapshot();
            if let Some(worst) = snapshot.last() {
                info!(
                    "tracking {} validators, worst: {} with {}/{} missed",
                    snapshot.len(),
                    worst.address,
                    worst.missed_blocks,
                    worst.total_blocks
                );
            }
        }
    });
}
