use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::NodeConfig;

#[derive(Parser, Debug)]
#[command(
    name = "simchain-node",
    version,
    about = "A Proof-of-Stake ledger node for the SIMCOIN simulation network"
)]
pub struct NodeCliArgs {
    /// Port for the HTTP API
    #[arg(short, long, help = "Port to listen on (overrides the config file)")]
    pub port: Option<u16>,

    /// Interface for the HTTP API
    #[arg(long, help = "Interface to bind (overrides the config file)")]
    pub host: Option<IpAddr>,

    /// Identifier used for staking and the snapshot file
    #[arg(long = "id", help = "Node identifier, defaults to 127.0.0.1:<port>")]
    pub node_id: Option<String>,

    /// Peers to register on startup
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma separated peer addresses to register on startup"
    )]
    pub peers: Vec<String>,

    /// TOML configuration file
    #[arg(short, long, help = "Path to a node.toml configuration file")]
    pub config: Option<PathBuf>,

    /// Directory holding the node snapshot
    #[arg(long, help = "Snapshot directory (overrides the config file)")]
    pub data_dir: Option<PathBuf>,

    /// Log level for node operation
    #[arg(
        short,
        long,
        default_value = "info",
        help = "Set the logging level",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,
}

impl NodeCliArgs {
    pub fn get_log_level(&self) -> tracing::Level {
        match self.log_level.as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }

    /// Apply command line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(node_id) = &self.node_id {
            config.node_id = Some(node_id.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
    }
}
