use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::transaction::Transaction;
use super::unix_timestamp;
use crate::error::ValidationError;

/// Sentinel `previous_hash` carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Validator label of the genesis block
pub const GENESIS_VALIDATOR: &str = "Genesis";

/// A block of ordered transactions linked to its predecessor by hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, genesis is 0
    pub index: u64,
    /// When this block was forged, as Unix seconds
    pub timestamp: f64,
    /// Transactions in replay order
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block
    pub previous_hash: String,
    /// Identifier of the node that forged the block
    pub validator: String,
    /// Canonical hash over every other field
    pub hash: String,
}

impl Block {
    /// Builds a block and seals it with its canonical hash
    pub fn new(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        validator: impl Into<String>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash: previous_hash.into(),
            validator: validator.into(),
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The fixed first block. Its timestamp is pinned so every node derives
    /// the same genesis hash.
    pub fn genesis() -> Self {
        Self::new(
            0,
            0.0,
            Vec::new(),
            GENESIS_PREVIOUS_HASH,
            GENESIS_VALIDATOR,
        )
    }

    /// Builds the successor of `previous` stamped with the current time
    pub fn forge(previous: &Block, validator: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        Self::new(
            previous.index + 1,
            unix_timestamp(),
            transactions,
            previous.hash.clone(),
            validator,
        )
    }

    /// Calculate the canonical hash of the block.
    ///
    /// Every variable-length field is length-prefixed so that no two distinct
    /// blocks share an encoding. The `hash` field itself is excluded.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_bits().to_le_bytes());
        update_str(&mut hasher, &self.previous_hash);
        update_str(&mut hasher, &self.validator);

        hasher.update((self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            update_str(&mut hasher, &tx.sender);
            update_str(&mut hasher, &tx.recipient);
            hasher.update(tx.amount.to_le_bytes());
            hasher.update([tx.token_type.tag()]);
            hasher.update(tx.timestamp.to_bits().to_le_bytes());
            update_str(&mut hasher, &tx.transaction_id);
        }

        hex::encode(hasher.finalize())
    }

    /// Whether the stored hash matches the canonical recomputation
    pub fn has_valid_hash(&self) -> bool {
        self.calculate_hash() == self.hash
    }

    pub fn contains_transaction(&self, transaction_id: &str) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.transaction_id == transaction_id)
    }

    /// Structural check: field formats and every contained transaction
    pub fn validate_structure(&self) -> Result<(), ValidationError> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(ValidationError::InvalidTimestamp("block"));
        }
        if self.validator.trim().is_empty() {
            return Err(ValidationError::MissingField("validator"));
        }
        if !is_hex_digest(&self.hash) {
            return Err(ValidationError::InvalidHash {
                field: "hash",
                value: self.hash.clone(),
            });
        }
        let previous_ok = if self.index == 0 {
            self.previous_hash == GENESIS_PREVIOUS_HASH
        } else {
            is_hex_digest(&self.previous_hash)
        };
        if !previous_ok {
            return Err(ValidationError::InvalidHash {
                field: "previous_hash",
                value: self.previous_hash.clone(),
            });
        }
        for tx in &self.transactions {
            tx.validate()?;
        }
        Ok(())
    }
}

/// Full chain as served to clients and peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn is_hex_digest(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
