pub mod block;
pub mod cmd;
pub mod config;
pub mod consensus;
pub mod ledger;
pub mod network;
pub mod node;
pub mod storage;

pub use config::NodeConfig;
pub use node::{Node, NodeError, NodeResult};
