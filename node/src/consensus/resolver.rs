use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::block::validator::{check_chain_turns, validate_chain, ValidatedChain};
use crate::ledger::StakeTable;
use crate::network::peer::PeerClient;
use crate::node::Node;
use simchain_common::{ChainResponse, IntegrityError, LedgerError};

/// A fully validated peer chain longer than the local one
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: ValidatedChain,
}

/// Longest-valid-chain fork choice over the known peers
pub struct ConsensusResolver {
    client: Arc<dyn PeerClient>,
}

impl ConsensusResolver {
    pub fn new(client: Arc<dyn PeerClient>) -> Self {
        Self { client }
    }

    /// Query every peer and return the longest chain that validates from
    /// genesis and is strictly longer than `local_len`. Ties keep the peer
    /// listed first. With `turns` set, every block must also have been forged
    /// by the validator that table selects for its round.
    pub async fn find_longest(
        &self,
        node_id: &str,
        peers: &[String],
        local_len: usize,
        turns: Option<&StakeTable>,
    ) -> Option<Candidate> {
        let targets: Vec<&String> = peers.iter().filter(|peer| *peer != node_id).collect();
        let fetches = targets.iter().map(|peer| self.client.fetch_chain(peer));
        let responses = join_all(fetches).await;

        let mut best: Option<Candidate> = None;
        for (peer, response) in targets.into_iter().zip(responses) {
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Failed to fetch peer chain");
                    continue;
                }
            };

            let chain = match check_response(response, turns) {
                Ok(chain) => chain,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Discarding invalid peer chain");
                    continue;
                }
            };

            let longest = best.as_ref().map_or(local_len, |c| c.chain.len());
            debug!(peer = %peer, length = chain.len(), longest, "Peer chain validated");
            if chain.len() > longest {
                best = Some(Candidate {
                    peer: peer.clone(),
                    chain,
                });
            }
        }

        best
    }
}

fn check_response(
    response: ChainResponse,
    turns: Option<&StakeTable>,
) -> Result<ValidatedChain, LedgerError> {
    if response.length != response.chain.len() {
        return Err(IntegrityError::LengthMismatch {
            reported: response.length,
            actual: response.chain.len(),
        }
        .into());
    }
    let chain = validate_chain(response.chain)?;
    if let Some(stakes) = turns {
        check_chain_turns(chain.blocks(), stakes)?;
    }
    Ok(chain)
}

/// Periodically run conflict resolution until the task is aborted
pub async fn run_periodic_resolution(node: Arc<Node>, period: Duration) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    info!(node_id = %node.node_id(), period_secs = period.as_secs(), "Periodic resolution started");
    loop {
        interval.tick().await;
        if node.resolve().await {
            info!(node_id = %node.node_id(), length = node.chain_len(), "Local chain replaced");
        }
    }
}
