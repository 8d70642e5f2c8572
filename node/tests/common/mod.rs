#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use simchain_common::{Block, ChainResponse};
use simchain_node::block::RoundOutcome;
use simchain_node::network::{PeerClient, PeerError, PeerResult};
use simchain_node::{Node, NodeConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Routes peer calls straight to other in-process nodes
#[derive(Default)]
pub struct InMemoryNetwork {
    nodes: RwLock<HashMap<String, Arc<Node>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, node: &Arc<Node>) {
        self.nodes
            .write()
            .insert(node.node_id().to_string(), Arc::clone(node));
    }

    fn lookup(&self, peer: &str) -> PeerResult<Arc<Node>> {
        self.nodes
            .read()
            .get(peer)
            .cloned()
            .ok_or_else(|| PeerError::Unreachable {
                peer: peer.to_string(),
                reason: "not attached".to_string(),
            })
    }
}

#[async_trait]
impl PeerClient for InMemoryNetwork {
    async fn fetch_chain(&self, peer: &str) -> PeerResult<ChainResponse> {
        Ok(self.lookup(peer)?.get_chain())
    }

    async fn send_block(&self, peer: &str, block: &Block) -> PeerResult<()> {
        self.lookup(peer)?
            .receive_block(block.clone())
            .map_err(|e| PeerError::Status {
                peer: peer.to_string(),
                status: 400,
                message: e.to_string(),
            })
    }
}

pub fn test_config(dir: &TempDir, node_id: &str) -> NodeConfig {
    NodeConfig {
        node_id: Some(node_id.to_string()),
        data_dir: dir.path().to_path_buf(),
        block_reward: 0,
        ..NodeConfig::default()
    }
}

/// A node on `network` that forges whenever asked
pub fn spawn_node(network: &Arc<InMemoryNetwork>, dir: &TempDir, node_id: &str) -> Arc<Node> {
    let mut config = test_config(dir, node_id);
    config.forge_empty_blocks = true;
    let node = Arc::new(Node::open(config, network.clone()).unwrap());
    network.attach(&node);
    node
}

/// Forge one round and insist this node produced the block
pub fn forge(node: &Node) -> Block {
    match node.forge_round().unwrap() {
        RoundOutcome::Forged(block) => block,
        other => panic!("{} did not forge: {other:?}", node.node_id()),
    }
}
