pub mod state;

use futures::future::join_all;
use parking_lot::RwLock;
use simchain_common::{
    Balances, Block, ChainResponse, LedgerError, LedgerResult, TokenType, Transaction,
    TransactionRequest, ValidationError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::block::forger::RoundOutcome;
use crate::block::selection::select_validator;
use crate::block::validator::{check_turn, validate_block};
use crate::config::NodeConfig;
use crate::consensus::ConsensusResolver;
use crate::ledger::StakeTable;
use crate::network::peer::{normalize_peer_address, PeerClient};
use crate::storage::{PersistenceError, PersistenceManager};

pub use state::NodeState;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Result of a peer registration call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationReport {
    /// Normalized peers that were not known before
    pub added: Vec<String>,
    /// Entries that could not be parsed as peer addresses
    pub rejected: Vec<ValidationError>,
    /// Number of known peers after registration
    pub total: usize,
}

/// Outcome of broadcasting a block to every known peer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// One ledger node: the state behind a single lock, its persistence and the
/// transport used to reach peers.
///
/// Every mutation takes the write lock, commits, and snapshots while still
/// holding it. Network calls never run under the lock. The mutating methods
/// block on disk I/O, so async callers run them through
/// `tokio::task::spawn_blocking`.
pub struct Node {
    node_id: String,
    config: NodeConfig,
    state: RwLock<NodeState>,
    persistence: PersistenceManager,
    peer_client: Arc<dyn PeerClient>,
    resolver: ConsensusResolver,
}

impl Node {
    /// Restore the node from its snapshot, or start from genesis when none
    /// exists. An unreadable snapshot or one holding an invalid chain is fatal.
    pub fn open(config: NodeConfig, peer_client: Arc<dyn PeerClient>) -> NodeResult<Self> {
        let node_id = config.identifier();
        let persistence = PersistenceManager::new(&config.data_dir, &node_id);

        let state = match persistence.load()? {
            Some(snapshot) => {
                if snapshot.node_id != node_id {
                    warn!(
                        node_id = %node_id,
                        snapshot_node_id = %snapshot.node_id,
                        "Snapshot was written under a different identifier"
                    );
                }
                NodeState::from_snapshot(snapshot, &node_id, config.default_self_stake).map_err(
                    |e| PersistenceError::Corrupt {
                        path: persistence.path().to_path_buf(),
                        reason: e.to_string(),
                    },
                )?
            }
            None => NodeState::fresh(&node_id, config.default_self_stake),
        };

        info!(
            node_id = %node_id,
            chain_length = state.ledger.len(),
            peers = state.peers.len(),
            snapshot = %persistence.path().display(),
            "Node opened"
        );

        Ok(Self {
            resolver: ConsensusResolver::new(Arc::clone(&peer_client)),
            node_id,
            config,
            state: RwLock::new(state),
            persistence,
            peer_client,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn get_chain(&self) -> ChainResponse {
        ChainResponse::new(self.state.read().ledger.chain().to_vec())
    }

    pub fn chain_len(&self) -> usize {
        self.state.read().ledger.len()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().ledger.pending().to_vec()
    }

    pub fn stakes(&self) -> StakeTable {
        self.state.read().stakes.clone()
    }

    pub fn known_wallets(&self) -> Vec<String> {
        self.state.read().wallets.iter().cloned().collect()
    }

    pub fn get_peers(&self) -> Vec<String> {
        self.state.read().peers.iter().cloned().collect()
    }

    pub fn get_balance(&self, address: &str) -> Balances {
        self.state.read().ledger.balances(address)
    }

    /// Stamp a client request and admit it to the pending pool. Returns the
    /// index of the block it should be confirmed in.
    pub fn submit_transaction(&self, request: TransactionRequest) -> LedgerResult<u64> {
        let tx = request.into_transaction()?;
        self.submit(tx)
    }

    /// Admit an already stamped transaction to the pending pool
    pub fn submit(&self, tx: Transaction) -> LedgerResult<u64> {
        let mut state = self.state.write();
        let block_index = state.ledger.enqueue(tx)?;
        self.persist(&state);
        Ok(block_index)
    }

    /// Validate and append a block forged elsewhere
    pub fn receive_block(&self, block: Block) -> LedgerResult<()> {
        let mut state = self.state.write();

        let validated = match validate_block(block, state.ledger.chain()) {
            Ok(validated) => validated,
            Err(e) => {
                warn!(node_id = %self.node_id, error = %e, "Rejected inbound block");
                return Err(e);
            }
        };

        if self.config.enforce_validator_turn {
            if let Some(selection) = select_validator(validated.index, &state.stakes) {
                check_turn(&validated, &selection.validator)?;
            }
        }

        state.ledger.append(validated);
        self.persist(&state);
        Ok(())
    }

    /// Add peers with the default stake. Known peers, the node itself and
    /// malformed entries leave the state untouched.
    pub fn register_peers<I, S>(&self, addresses: I) -> RegistrationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RegistrationReport::default();
        let mut state = self.state.write();

        for raw in addresses {
            let peer = match normalize_peer_address(raw.as_ref()) {
                Ok(peer) => peer,
                Err(e) => {
                    warn!(entry = %raw.as_ref(), "Ignoring invalid peer address");
                    report.rejected.push(e);
                    continue;
                }
            };

            if peer == self.node_id || state.peers.contains(&peer) {
                continue;
            }

            state.stakes.ensure(&peer, self.config.default_peer_stake);
            state.peers.insert(peer.clone());
            info!(node_id = %self.node_id, peer = %peer, "Peer registered");
            report.added.push(peer);
        }

        report.total = state.peers.len();
        if !report.added.is_empty() {
            self.persist(&state);
        }
        report
    }

    /// Run one pass of conflict resolution. Returns whether the local chain
    /// was replaced.
    pub async fn resolve(&self) -> bool {
        let (peers, local_len, turns) = {
            let state = self.state.read();
            (
                state.peers.iter().cloned().collect::<Vec<_>>(),
                state.ledger.len(),
                self.config
                    .enforce_validator_turn
                    .then(|| state.stakes.clone()),
            )
        };

        let candidate = match self
            .resolver
            .find_longest(&self.node_id, &peers, local_len, turns.as_ref())
            .await
        {
            Some(candidate) => candidate,
            None => {
                debug!(node_id = %self.node_id, local_length = local_len, "Local chain is authoritative");
                return false;
            }
        };

        let mut state = self.state.write();
        // Forging may have extended the local chain while peers were queried
        if candidate.chain.len() <= state.ledger.len() {
            info!(
                node_id = %self.node_id,
                peer = %candidate.peer,
                candidate_length = candidate.chain.len(),
                local_length = state.ledger.len(),
                "Candidate chain no longer longer than local chain"
            );
            return false;
        }

        info!(
            node_id = %self.node_id,
            peer = %candidate.peer,
            new_length = candidate.chain.len(),
            "Adopting longer chain"
        );
        state.ledger.replace_chain(candidate.chain);
        self.persist(&state);
        true
    }

    /// Mint a fresh opaque wallet address and remember it
    pub fn new_wallet(&self) -> String {
        let address = Uuid::new_v4().to_string();
        let mut state = self.state.write();
        state.wallets.insert(address.clone());
        self.persist(&state);
        debug!(address = %address, "Wallet created");
        address
    }

    /// Forge the block for the current round if this node is the selected
    /// validator. The block is appended locally; broadcasting is left to the
    /// caller so no network call happens under the lock.
    pub fn forge_round(&self) -> LedgerResult<RoundOutcome> {
        let mut state = self.state.write();
        let round = state.ledger.len() as u64;

        let selection = match select_validator(round, &state.stakes) {
            Some(selection) => selection,
            None => return Ok(RoundOutcome::NoValidator { round }),
        };
        if selection.validator != self.node_id {
            return Ok(RoundOutcome::NotSelected {
                round,
                expected: selection.validator,
            });
        }
        if state.ledger.pending().is_empty() && !self.config.forge_empty_blocks {
            return Ok(RoundOutcome::Idle { round });
        }

        let mut transactions = state
            .ledger
            .pending_prefix(self.config.max_block_transactions);
        if self.config.block_reward > 0 {
            transactions.push(Transaction::mint(
                self.node_id.as_str(),
                self.config.block_reward,
                TokenType::Main,
            ));
        }

        let candidate = Block::forge(state.ledger.tip(), self.node_id.as_str(), transactions);
        let validated = validate_block(candidate, state.ledger.chain())?;
        let block = (*validated).clone();

        state.ledger.append(validated);
        self.persist(&state);
        Ok(RoundOutcome::Forged(block))
    }

    /// Offer `block` to every known peer concurrently. Failures are logged
    /// and left for the peers' next resolution pass.
    pub async fn broadcast_block(&self, block: &Block) -> BroadcastReport {
        let peers = self.get_peers();
        let sends = peers.iter().map(|peer| async move {
            let result = self.peer_client.send_block(peer, block).await;
            (peer, result)
        });

        let mut report = BroadcastReport::default();
        for (peer, result) in join_all(sends).await {
            match result {
                Ok(()) => {
                    debug!(peer = %peer, index = block.index, "Block delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(peer = %peer, index = block.index, error = %e, "Block broadcast failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Write the current state; failures are logged and never undo the
    /// in-memory mutation
    fn persist(&self, state: &NodeState) {
        if let Err(e) = self.persistence.save(&state.to_snapshot(&self.node_id)) {
            error!(
                node_id = %self.node_id,
                path = %self.persistence.path().display(),
                error = %e,
                "Failed to persist node snapshot"
            );
        }
    }
}

