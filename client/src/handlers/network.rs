use async_trait::async_trait;

use crate::api::{ClientResult, NodeClient};
use crate::handlers::Handler;

pub struct RegisterHandler {
    nodes: Vec<String>,
}

impl RegisterHandler {
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl Handler for RegisterHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.register_nodes(&self.nodes).await?;
        println!("{}", reply.message);
        for peer in &reply.added {
            println!("  added    {peer}");
        }
        for reason in &reply.rejected {
            println!("  rejected {reason}");
        }
        println!("Known peers: {}", reply.total_nodes.join(", "));
        Ok(())
    }
}

pub struct PeersHandler;

#[async_trait]
impl Handler for PeersHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.peers().await?;
        if reply.nodes.is_empty() {
            println!("No peers registered");
        }
        for peer in reply.nodes {
            println!("{peer}");
        }
        Ok(())
    }
}

// Triggers one round of conflict resolution on the node
pub struct ResolveHandler;

#[async_trait]
impl Handler for ResolveHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.resolve().await?;
        println!("{} (replaced: {})", reply.message, reply.replaced);
        Ok(())
    }
}
