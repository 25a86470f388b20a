//! MIM Bridger
//!
//! Bridges MIM from every wallet in a key file across a LayerZero OFT
//! bridge, one wallet at a time with randomized amounts, order and pacing.
//!
//! # Usage
//!
//! ```text
//! mim-bridger --keys private_keys.txt --from Moonriver --to Fantom
//! mim-bridger --list-networks
//! ```

use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use mim_bridger::{load_keys, run_batch, ChainRegistry, Config};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mim-bridger")]
#[command(about = "Batch bridge MIM between LayerZero OFT networks", long_about = None)]
struct Cli {
    /// Env file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Private key file (overrides PRIVATE_KEYS_FILE)
    #[arg(short, long)]
    keys: Option<PathBuf>,

    /// Source network (overrides FROM_NETWORK)
    #[arg(long)]
    from: Option<String>,

    /// Destination network (overrides TO_NETWORK)
    #[arg(long)]
    to: Option<String>,

    /// RNG seed for reproducible order, amounts and delays (overrides RNG_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the batch summary as JSON to this path
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Print configured networks and exit
    #[arg(long)]
    list_networks: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> eyre::Result<()> {
    init_logging(cli.json_logs);

    let mut config = Config::load(cli.env_file.as_deref())?;
    if let Some(keys) = cli.keys {
        config.keys_file = keys;
    }
    if let Some(from) = cli.from {
        config.bridge.from_network = from;
    }
    if let Some(to) = cli.to {
        config.bridge.to_network = to;
    }
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }

    if cli.list_networks {
        for chain in &config.chains {
            println!(
                "{:<12} evm={:<6} lz={:<5} bridge={} rpc={}",
                chain.name, chain.evm_chain_id, chain.bridge_chain_id, chain.bridge_address, chain.rpc_url
            );
        }
        return Ok(());
    }

    config.validate()?;
    let bridge = &config.bridge;
    info!(
        from = %bridge.from_network,
        to = %bridge.to_network,
        entire_balance = bridge.transfer_entire_balance,
        shuffle = bridge.random_wallet_order,
        max_attempts = bridge.retry.max_attempts,
        "Configuration loaded"
    );

    let registry = ChainRegistry::connect(config.chains.clone()).await?;
    info!(networks = ?registry.names(), "Registry ready");
    let (source, destination) = registry.select_pair(&bridge.from_network, &bridge.to_network)?;
    let keys = load_keys(&config.keys_file)?;

    let mut rng = match config.rng_seed {
        Some(seed) => {
            info!(seed, "Using seeded RNG");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let summary = tokio::select! {
        summary = run_batch(&keys, source.as_ref(), destination.as_ref(), bridge, &mut rng) => summary,
        _ = wait_for_shutdown_signal() => {
            warn!("Batch interrupted before all wallets were processed");
            return Ok(());
        }
    };

    if let Some(path) = cli.summary_out {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)
            .wrap_err_with(|| format!("Failed to write summary to {}", path.display()))?;
        info!(path = %path.display(), "Summary written");
    }

    info!(
        wallets = summary.reports.len(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "All done"
    );
    Ok(())
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mim_bridger=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping batch");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping batch");
        }
    }
}
