use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use simchain_node::block::Forger;
use simchain_node::cmd::cli::NodeCliArgs;
use simchain_node::config::NodeConfig;
use simchain_node::consensus::run_periodic_resolution;
use simchain_node::network::{api, HttpPeerClient};
use simchain_node::Node;

fn load_config(args: &NodeCliArgs) -> anyhow::Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => NodeConfig::load_default().context("loading default configuration")?,
    };
    args.apply(&mut config);
    config.validate().context("validating configuration")?;
    config
        .initialize_directories()
        .context("creating data directory")?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = NodeCliArgs::parse();

    // Initialize logging with configured level
    tracing_subscriber::fmt()
        .with_max_level(args.get_log_level())
        .with_target(true)
        .init();

    if let Err(e) = run(args).await {
        error!("Node terminated: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: NodeCliArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    info!(
        node_id = %config.identifier(),
        address = %config.listen_address(),
        forging_interval_secs = config.forging_interval_secs,
        "Starting simchain node"
    );

    let client = HttpPeerClient::new(config.peer_timeout()).context("building peer client")?;
    let node = Arc::new(Node::open(config.clone(), Arc::new(client)).context("opening node state")?);

    if !args.peers.is_empty() {
        let report = node.register_peers(&args.peers);
        info!(added = report.added.len(), total = report.total, "Registered startup peers");
        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "Some startup peers were invalid");
        }
    }

    let forger = Forger::new(Arc::clone(&node), config.forging_interval());
    let forger_task = {
        let forger = forger.clone();
        tokio::spawn(async move { forger.run().await })
    };

    let resolver_task = config
        .resolve_interval()
        .map(|period| tokio::spawn(run_periodic_resolution(Arc::clone(&node), period)));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    let served = api::serve(Arc::clone(&node), config.listen_address(), shutdown).await;

    forger.stop();
    forger_task.abort();
    if let Some(task) = resolver_task {
        task.abort();
    }

    let stats = forger.get_stats();
    info!(
        rounds = stats.rounds,
        blocks_forged = stats.blocks_forged,
        rounds_skipped = stats.rounds_skipped,
        chain_length = node.chain_len(),
        "Node stopped"
    );

    served.context("serving HTTP API")
}
