use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for node configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Default values for configuration parameters
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 5000;
    pub const DATA_DIR: &str = "data";
    pub const FORGING_INTERVAL_SECS: u64 = 20;
    pub const RESOLVE_INTERVAL_SECS: u64 = 0;
    pub const PEER_TIMEOUT_MS: u64 = 10_000;
    pub const MAX_BLOCK_TRANSACTIONS: usize = 512;
    pub const BLOCK_REWARD: u64 = 10;
    pub const SELF_STAKE: u64 = 100;
    pub const PEER_STAKE: u64 = 50;
}

/// Runtime configuration of a single node
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Interface the HTTP surface binds to
    pub host: IpAddr,
    /// Port the HTTP surface listens on
    pub port: u16,
    /// Identifier used for staking and as the snapshot key.
    /// Falls back to `127.0.0.1:<port>` when unset.
    pub node_id: Option<String>,
    /// Directory holding the node snapshot
    pub data_dir: PathBuf,
    /// Period of the forging round
    pub forging_interval_secs: u64,
    /// Period of background conflict resolution, 0 disables it
    pub resolve_interval_secs: u64,
    /// Upper bound on every peer request
    pub peer_timeout_ms: u64,
    /// Largest pending-pool prefix drained into one block
    pub max_block_transactions: usize,
    /// MAIN tokens minted to the forger of each block, 0 disables it
    pub block_reward: u64,
    /// Stake assigned to this node on a fresh start
    pub default_self_stake: u64,
    /// Stake assigned to newly registered peers
    pub default_peer_stake: u64,
    /// Forge even when the pending pool is empty
    pub forge_empty_blocks: bool,
    /// Reject inbound blocks and peer chains whose validators are not the
    /// local selection for their rounds
    pub enforce_validator_turn: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: defaults::PORT,
            node_id: None,
            data_dir: PathBuf::from(defaults::DATA_DIR),
            forging_interval_secs: defaults::FORGING_INTERVAL_SECS,
            resolve_interval_secs: defaults::RESOLVE_INTERVAL_SECS,
            peer_timeout_ms: defaults::PEER_TIMEOUT_MS,
            max_block_transactions: defaults::MAX_BLOCK_TRANSACTIONS,
            block_reward: defaults::BLOCK_REWARD,
            default_self_stake: defaults::SELF_STAKE,
            default_peer_stake: defaults::PEER_STAKE,
            forge_empty_blocks: false,
            enforce_validator_turn: false,
        }
    }
}

impl NodeConfig {
    /// Loads the configuration from the default location, or defaults when
    /// no configuration file exists
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_config_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the configuration from a specific path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Determines the default configuration path
    fn default_config_path() -> Option<PathBuf> {
        // First check if path is specified in environment
        if let Ok(path) = env::var("SIMCHAIN_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let default_path = PathBuf::from("config").join("node.toml");
        default_path.exists().then_some(default_path)
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation("Port must be greater than 0".to_string()));
        }

        if self.forging_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Forging interval must be at least 1 second".to_string(),
            ));
        }

        if self.peer_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Peer timeout must be greater than 0ms".to_string(),
            ));
        }

        if self.max_block_transactions == 0 {
            return Err(ConfigError::Validation(
                "A block must be allowed to hold at least one transaction".to_string(),
            ));
        }

        if let Some(id) = &self.node_id {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation("Node identifier cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Identifier this node stakes and forges under
    pub fn identifier(&self) -> String {
        self.node_id
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", self.port))
    }

    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn forging_interval(&self) -> Duration {
        Duration::from_secs(self.forging_interval_secs)
    }

    pub fn resolve_interval(&self) -> Option<Duration> {
        (self.resolve_interval_secs > 0).then(|| Duration::from_secs(self.resolve_interval_secs))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    /// Creates the data directory if it does not exist yet
    pub fn initialize_directories(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.identifier(), "127.0.0.1:5000");
        assert_eq!(config.forging_interval(), Duration::from_secs(20));
        assert_eq!(config.resolve_interval(), None);
        assert_eq!(config.host.to_string(), defaults::HOST);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            port = 5001
            node_id = "alpha"
            block_reward = 0
            resolve_interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 5001);
        assert_eq!(config.identifier(), "alpha");
        assert_eq!(config.block_reward, 0);
        assert_eq!(config.resolve_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.default_peer_stake, defaults::PEER_STAKE);
    }

    #[test]
    fn test_validation() {
        let mut config = NodeConfig::default();
        config.forging_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = NodeConfig::default();
        config.max_block_transactions = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = NodeConfig::default();
        config.node_id = Some("  ".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        fs::write(&path, "port = 6000\nforge_empty_blocks = true\n").unwrap();

        let config = NodeConfig::load(&path).unwrap();
        assert_eq!(config.port, 6000);
        assert!(config.forge_empty_blocks);

        fs::write(&path, "port = \"not a number\"\n").unwrap();
        assert!(matches!(NodeConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
