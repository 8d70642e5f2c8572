use simchain_common::LedgerResult;
use std::collections::BTreeSet;

use crate::ledger::{LedgerStore, StakeTable};
use crate::storage::Snapshot;

/// Mutable state of one node. Always accessed through the node's single lock.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub ledger: LedgerStore,
    pub stakes: StakeTable,
    pub peers: BTreeSet<String>,
    pub wallets: BTreeSet<String>,
}

impl NodeState {
    /// Genesis-only state with the node's own stake entry
    pub fn fresh(node_id: &str, self_stake: u64) -> Self {
        let mut state = Self::default();
        state.stakes.ensure(node_id, self_stake);
        state
    }

    /// Rebuild from a snapshot. The chain is validated from genesis before
    /// anything is accepted.
    pub fn from_snapshot(snapshot: Snapshot, node_id: &str, self_stake: u64) -> LedgerResult<Self> {
        let ledger = LedgerStore::from_parts(snapshot.chain, snapshot.pending_transactions)?;
        let mut stakes = snapshot.stakes;
        stakes.ensure(node_id, self_stake);

        let mut peers = snapshot.peers;
        peers.remove(node_id);

        Ok(Self {
            ledger,
            stakes,
            peers,
            wallets: snapshot.known_wallets,
        })
    }

    pub fn to_snapshot(&self, node_id: &str) -> Snapshot {
        Snapshot {
            node_id: node_id.to_string(),
            chain: self.ledger.chain().to_vec(),
            pending_transactions: self.ledger.pending().to_vec(),
            peers: self.peers.clone(),
            stakes: self.stakes.clone(),
            known_wallets: self.wallets.clone(),
        }
    }
}
