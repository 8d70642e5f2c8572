// Basic trait that all handlers must implement
use async_trait::async_trait;

use crate::api::{ClientResult, NodeClient};

#[async_trait]
pub trait Handler {
    async fn handle(&mut self, client: &NodeClient) -> ClientResult<()>;
}

// Declare the submodules
pub mod ledger;
pub mod network;
pub mod wallet;

pub use ledger::{ChainHandler, PendingHandler};
pub use network::{PeersHandler, RegisterHandler, ResolveHandler};
pub use wallet::{BalanceHandler, NewWalletHandler, SendHandler};
