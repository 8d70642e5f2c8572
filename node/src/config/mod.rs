pub mod node;

pub use node::{ConfigError, NodeConfig};
