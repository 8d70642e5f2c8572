use simchain_common::{Block, IntegrityError, LedgerResult, GENESIS_PREVIOUS_HASH};
use std::ops::Deref;
use tracing::{debug, warn};

use super::selection::select_validator;
use crate::ledger::StakeTable;

/// A block that passed every check against the chain it was validated for.
/// Only this module can construct one, so the ledger store never appends
/// unchecked data.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlock(Block);

impl ValidatedBlock {
    pub fn into_inner(self) -> Block {
        self.0
    }
}

impl Deref for ValidatedBlock {
    type Target = Block;

    fn deref(&self) -> &Block {
        &self.0
    }
}

/// A full chain validated from genesis through tip
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedChain(Vec<Block>);

impl ValidatedChain {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Block> {
        self.0
    }
}

/// Validate a candidate or inbound block against the current local chain.
///
/// Checks run in order: structure, index, linkage, hash. The first failure
/// rejects the whole block.
pub fn validate_block(block: Block, chain: &[Block]) -> LedgerResult<ValidatedBlock> {
    check_block(&block, chain)?;
    Ok(ValidatedBlock(block))
}

/// Validate a complete chain, applying the block checks to every block in
/// sequence rather than only the tip.
pub fn validate_chain(chain: Vec<Block>) -> LedgerResult<ValidatedChain> {
    let genesis = chain.first().ok_or(IntegrityError::EmptyChain)?;
    validate_genesis(genesis)?;

    for i in 1..chain.len() {
        if let Err(e) = check_block(&chain[i], &chain[..i]) {
            warn!(index = i, error = %e, "Chain validation failed");
            return Err(e);
        }
    }

    debug!(length = chain.len(), "Chain validation successful");
    Ok(ValidatedChain(chain))
}

/// Genesis needs the sentinel linkage, no transactions and a correct hash,
/// and must be the canonical genesis every node starts from. No validator
/// check applies.
pub fn validate_genesis(block: &Block) -> LedgerResult<()> {
    if block.index != 0 {
        return Err(IntegrityError::InvalidGenesis(format!("index is {}", block.index)).into());
    }
    if block.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(IntegrityError::InvalidGenesis(format!(
            "previous_hash is '{}'",
            block.previous_hash
        ))
        .into());
    }
    if !block.transactions.is_empty() {
        return Err(IntegrityError::InvalidGenesis(format!(
            "carries {} transactions",
            block.transactions.len()
        ))
        .into());
    }
    block.validate_structure()?;
    check_hash(block)?;

    let canonical = Block::genesis();
    if block.hash != canonical.hash {
        return Err(IntegrityError::InvalidGenesis(format!(
            "hash {} differs from canonical genesis {}",
            block.hash, canonical.hash
        ))
        .into());
    }
    Ok(())
}

/// Rejects a block whose forger differs from the validator selected for its
/// round
pub fn check_turn(block: &Block, expected_validator: &str) -> Result<(), IntegrityError> {
    if block.validator != expected_validator {
        return Err(IntegrityError::OutOfTurn {
            index: block.index,
            expected: expected_validator.to_string(),
            received: block.validator.clone(),
        });
    }
    Ok(())
}

/// Applies [`check_turn`] to every block after genesis using the local stake
/// table. Rounds with no eligible validator are not checked.
pub fn check_chain_turns(blocks: &[Block], stakes: &StakeTable) -> Result<(), IntegrityError> {
    for block in blocks.iter().skip(1) {
        if let Some(selection) = select_validator(block.index, stakes) {
            check_turn(block, &selection.validator)?;
        }
    }
    Ok(())
}

fn check_block(block: &Block, chain: &[Block]) -> LedgerResult<()> {
    // 1. Structure
    block.validate_structure()?;

    // 2. Index must be exactly the next slot
    let tip = chain.last().ok_or(IntegrityError::EmptyChain)?;
    let expected = chain.len() as u64;
    if block.index != expected {
        return Err(IntegrityError::IndexMismatch {
            expected,
            received: block.index,
        }
        .into());
    }

    // 3. Linkage
    if block.previous_hash != tip.hash {
        return Err(IntegrityError::PreviousHashMismatch {
            index: block.index,
            expected: tip.hash.clone(),
            received: block.previous_hash.clone(),
        }
        .into());
    }

    // 4. Hash
    check_hash(block)
}

fn check_hash(block: &Block) -> LedgerResult<()> {
    let recalculated = block.calculate_hash();
    if recalculated != block.hash {
        return Err(IntegrityError::HashMismatch {
            index: block.index,
            stored: block.hash.clone(),
            recalculated,
        }
        .into());
    }
    Ok(())
}
