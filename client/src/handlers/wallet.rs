use async_trait::async_trait;
use simchain_common::{TokenType, TransactionRequest};

use crate::api::{ClientResult, NodeClient};
use crate::handlers::Handler;

// Creates a fresh wallet address on the node
pub struct NewWalletHandler;

#[async_trait]
impl Handler for NewWalletHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let address = client.create_wallet().await?;
        println!("New wallet address: {address}");
        Ok(())
    }
}

// Submits a transfer, or a mint when the sender is the faucet
pub struct SendHandler {
    request: TransactionRequest,
}

impl SendHandler {
    pub fn new(sender: String, recipient: String, amount: u64, token_type: TokenType) -> Self {
        Self {
            request: TransactionRequest {
                sender,
                recipient,
                amount,
                token_type,
            },
        }
    }
}

#[async_trait]
impl Handler for SendHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.create_transaction(&self.request).await?;
        println!("{} (block {})", reply.message, reply.block_index);
        Ok(())
    }
}

pub struct BalanceHandler {
    address: String,
}

impl BalanceHandler {
    pub fn new(address: String) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Handler for BalanceHandler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()> {
        let reply = client.get_balance(&self.address).await?;
        println!("Balances of {}:", reply.address);
        for token in TokenType::ALL {
            println!("  {:<7} {}", token.as_str(), reply.balances.get(token));
        }
        println!("  ({} is the {} token)", TokenType::Main, reply.token_name);
        Ok(())
    }
}
