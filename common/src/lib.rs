// Expose our type system
pub mod types;
pub mod error;

// Re-export commonly used types
pub use error::{IntegrityError, LedgerError, LedgerResult, ValidationError};
pub use types::block::{Block, ChainResponse, GENESIS_PREVIOUS_HASH, GENESIS_VALIDATOR};
pub use types::token::{Balances, TokenType, FAUCET_ADDRESS, TOKEN_NAME};
pub use types::transaction::{Transaction, TransactionRequest};
