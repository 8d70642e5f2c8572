use parking_lot::Mutex;
use simchain_common::Block;
use std::sync::Arc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::node::Node;

/// Represents the current state of the forger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgerState {
    /// Forging a round on every tick
    Running,
    /// Ticks are ignored until resumed
    Paused,
    /// The loop exits on the next tick
    Stopped,
}

/// What happened in a single forging round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// This node was selected and appended the block
    Forged(Block),
    /// Another peer is the validator for this round
    NotSelected { round: u64, expected: String },
    /// Selected, but there was nothing to forge
    Idle { round: u64 },
    /// No entry in the stake table has a positive weight
    NoValidator { round: u64 },
}

/// Drives the periodic forging rounds of a node
#[derive(Clone)]
pub struct Forger {
    node: Arc<Node>,
    interval: Duration,
    state: Arc<Mutex<ForgerState>>,
    stats: Arc<Mutex<ForgerStats>>,
}

impl Forger {
    pub fn new(node: Arc<Node>, interval: Duration) -> Self {
        Self {
            node,
            interval,
            state: Arc::new(Mutex::new(ForgerState::Running)),
            stats: Arc::new(Mutex::new(ForgerStats::default())),
        }
    }

    /// Start the forging loop
    pub async fn run(&self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        info!(
            node_id = %self.node.node_id(),
            interval_ms = self.interval.as_millis() as u64,
            "Forger started"
        );

        loop {
            interval.tick().await;

            match *self.state.lock() {
                ForgerState::Stopped => break,
                ForgerState::Paused => continue,
                ForgerState::Running => {}
            }

            self.run_round().await;
        }

        info!(node_id = %self.node.node_id(), "Forger exited");
    }

    /// Run a single round: forge under the node lock, then broadcast outside
    /// of it
    pub async fn run_round(&self) -> Option<RoundOutcome> {
        self.stats.lock().rounds += 1;

        let node = Arc::clone(&self.node);
        let outcome = match tokio::task::spawn_blocking(move || node.forge_round()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.stats.lock().failed_rounds += 1;
                error!(node_id = %self.node.node_id(), error = %e, "Forged block failed validation");
                return None;
            }
            Err(e) => {
                self.stats.lock().failed_rounds += 1;
                error!(node_id = %self.node.node_id(), error = %e, "Forging task failed");
                return None;
            }
        };

        match &outcome {
            RoundOutcome::Forged(block) => {
                self.stats.lock().blocks_forged += 1;
                info!(
                    node_id = %self.node.node_id(),
                    index = block.index,
                    hash = %block.hash,
                    transactions = block.transactions.len(),
                    "Forged block"
                );
                let report = self.node.broadcast_block(block).await;
                debug!(
                    index = block.index,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Broadcast finished"
                );
            }
            RoundOutcome::NotSelected { round, expected } => {
                self.stats.lock().rounds_skipped += 1;
                debug!(round, expected = %expected, "Not selected for round");
            }
            RoundOutcome::Idle { round } => {
                self.stats.lock().rounds_skipped += 1;
                debug!(round, "Selected but pending pool is empty");
            }
            RoundOutcome::NoValidator { round } => {
                self.stats.lock().rounds_skipped += 1;
                debug!(round, "No staked validator for round");
            }
        }

        Some(outcome)
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if *state == ForgerState::Running {
            *state = ForgerState::Paused;
            info!("Forger paused");
        }
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        if *state == ForgerState::Paused {
            *state = ForgerState::Running;
            info!("Forger resumed");
        }
    }

    /// Stop the forger completely
    pub fn stop(&self) {
        *self.state.lock() = ForgerState::Stopped;
        info!("Forger stopped");
    }

    pub fn get_stats(&self) -> ForgerStats {
        ForgerStats {
            current_state: *self.state.lock(),
            ..*self.stats.lock()
        }
    }
}

/// Counters describing forger activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForgerStats {
    /// Rounds attempted
    pub rounds: u64,
    /// Blocks this node forged and appended
    pub blocks_forged: u64,
    /// Rounds where this node forged nothing
    pub rounds_skipped: u64,
    /// Rounds whose candidate block failed validation
    pub failed_rounds: u64,
    pub current_state: ForgerState,
}

impl Default for ForgerStats {
    fn default() -> Self {
        Self {
            rounds: 0,
            blocks_forged: 0,
            rounds_skipped: 0,
            failed_rounds: 0,
            current_state: ForgerState::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::network::peer::{PeerClient, PeerError, PeerResult};
    use async_trait::async_trait;
    use simchain_common::{ChainResponse, TokenType, Transaction};

    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl PeerClient for RecordingClient {
        async fn fetch_chain(&self, peer: &str) -> PeerResult<ChainResponse> {
            Err(PeerError::Unreachable {
                peer: peer.to_string(),
                reason: "not used".to_string(),
            })
        }

        async fn send_block(&self, peer: &str, block: &Block) -> PeerResult<()> {
            self.sent.lock().push((peer.to_string(), block.index));
            Ok(())
        }
    }

    fn create_test_node(dir: &tempfile::TempDir, client: Arc<RecordingClient>) -> Arc<Node> {
        let config = NodeConfig {
            node_id: Some("127.0.0.1:5000".to_string()),
            data_dir: dir.path().to_path_buf(),
            default_peer_stake: 0,
            ..NodeConfig::default()
        };
        Arc::new(Node::open(config, client).unwrap())
    }

    #[tokio::test]
    async fn test_sole_validator_forges_and_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let node = create_test_node(&dir, Arc::clone(&client));
        node.submit(Transaction::mint("alice", 1000, TokenType::Main))
            .unwrap();

        // Peers join with zero stake so this node is always selected
        node.register_peers(["127.0.0.1:5001"]);
        let forger = Forger::new(Arc::clone(&node), Duration::from_secs(20));
        let outcome = forger.run_round().await.unwrap();

        let block = match outcome {
            RoundOutcome::Forged(block) => block,
            other => panic!("expected a forged block, got {other:?}"),
        };
        assert_eq!(block.index, 1);
        assert_eq!(block.validator, "127.0.0.1:5000");
        // Drained transaction first, reward last
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].recipient, "alice");
        assert_eq!(block.transactions[1].recipient, "127.0.0.1:5000");

        assert_eq!(node.chain_len(), 2);
        assert!(node.pending_transactions().is_empty());
        assert_eq!(node.get_balance("alice").main, 1000);
        assert_eq!(client.sent.lock().as_slice(), &[("127.0.0.1:5001".to_string(), 1)]);

        let stats = forger.get_stats();
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.blocks_forged, 1);
    }

    #[tokio::test]
    async fn test_empty_pool_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let node = create_test_node(&dir, Arc::new(RecordingClient::default()));
        let forger = Forger::new(Arc::clone(&node), Duration::from_secs(20));

        assert_eq!(
            forger.run_round().await,
            Some(RoundOutcome::Idle { round: 1 })
        );
        assert_eq!(node.chain_len(), 1);
        assert_eq!(forger.get_stats().rounds_skipped, 1);
    }

    #[tokio::test]
    async fn test_stop_ends_run_loop() {
        let dir = tempfile::tempdir().unwrap();
        let node = create_test_node(&dir, Arc::new(RecordingClient::default()));
        let forger = Forger::new(node, Duration::from_millis(20));

        let runner = forger.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        forger.pause();
        assert_eq!(forger.get_stats().current_state, ForgerState::Paused);
        forger.resume();
        forger.stop();

        time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forger.get_stats().current_state, ForgerState::Stopped);
    }
}
