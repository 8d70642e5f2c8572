use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simchain_common::{Block, Transaction};

use crate::api::{ClientResult, NodeClient};
use crate::handlers::Handler;

fn format_timestamp(timestamp: f64) -> String {
    let secs = timestamp.trunc() as i64;
    let nanos = (timestamp.fract() * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_transaction(tx: &Transaction) {
    println!(
        "    {} -> {}  {} {}  [{}]",
        tx.sender, tx.recipient, tx.amount, tx.token_type, tx.transaction_id
    );
}

fn print_block(block: &Block) {
    println!(
        "#{} {}  forged by {}  ({} transactions)",
        block.index,
        format_timestamp(block.timestamp),
        block.validator,
        block.transactions.len()
    );
    println!("    hash {}", block.hash);
    println!("    prev {}", block.previous_hash);
    block.transactions.iter().for_each(print_transaction);
}

// Dumps the node's chain, as JSON or as a readable listing
pub struct ChainHandler {
    json: bool,
}

impl ChainHandler {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

#[async_trait]
impl Handler for ChainHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let chain = client.get_chain().await?;
        if self.json {
            let pretty = serde_json::to_string_pretty(&chain)
                .map_err(|e| crate::api::ClientError::Decode(e.to_string()))?;
            println!("{pretty}");
            return Ok(());
        }

        println!("Chain of {} at length {}", client.base(), chain.length);
        chain.chain.iter().for_each(print_block);
        Ok(())
    }
}

pub struct PendingHandler;

#[async_trait]
impl Handler for PendingHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.pending().await?;
        if reply.transactions.is_empty() {
            println!("No pending transactions");
        }
        reply.transactions.iter().for_each(print_transaction);
        Ok(())
    }
}
