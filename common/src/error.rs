use thiserror::Error;

use crate::types::token::TokenType;

/// Core error types for the ledger. Every variant describes a rejected
/// operation that left chain and pending pool untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Malformed transaction or block fields
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A non-faucet sender tried to spend more than its confirmed balance
    #[error(
        "Insufficient balance: sender '{sender}' holds {available} {token}, requested {requested}"
    )]
    InsufficientBalance {
        sender: String,
        token: TokenType,
        available: i128,
        requested: u64,
    },

    /// Hash, linkage or index violations in a candidate, inbound or peer block
    #[error("Chain integrity error: {0}")]
    ChainIntegrity(#[from] IntegrityError),
}

/// Field-level problems detected at the system boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing value for '{0}'")]
    MissingField(&'static str),

    #[error("Amount must be a positive integer")]
    NonPositiveAmount,

    #[error("Invalid timestamp in {0}")]
    InvalidTimestamp(&'static str),

    #[error("Invalid hash in field '{field}': {value}")]
    InvalidHash { field: &'static str, value: String },

    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Violations of the hash-chain invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Chain is empty")]
    EmptyChain,

    #[error("Invalid genesis block: {0}")]
    InvalidGenesis(String),

    #[error("Block index out of sequence (expected {expected}, received {received})")]
    IndexMismatch { expected: u64, received: u64 },

    #[error("Previous hash mismatch at block {index} (expected {expected}, received {received})")]
    PreviousHashMismatch {
        index: u64,
        expected: String,
        received: String,
    },

    #[error("Hash verification failed at block {index} (stored {stored}, recalculated {recalculated})")]
    HashMismatch {
        index: u64,
        stored: String,
        recalculated: String,
    },

    #[error("Block {index} forged out of turn by '{received}' (expected '{expected}')")]
    OutOfTurn {
        index: u64,
        expected: String,
        received: String,
    },

    #[error("Reported chain length {reported} does not match {actual} blocks")]
    LengthMismatch { reported: usize, actual: usize },
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
