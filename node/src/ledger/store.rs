use std::collections::HashSet;

use simchain_common::{Balances, Block, LedgerResult, Transaction};
use tracing::{debug, info};

use super::balance::{balances_of, check_spendable};
use crate::block::validator::{validate_chain, ValidatedBlock, ValidatedChain};

/// Ordered chain plus the pending pool. Single source of truth for ledger
/// state; callers serialize access through the node lock.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    /// A store holding only the genesis block
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    /// Rebuild a store from restored parts. The chain is validated from
    /// genesis, every pending entry must be well formed, and entries already
    /// confirmed are dropped.
    pub fn from_parts(chain: Vec<Block>, pending: Vec<Transaction>) -> LedgerResult<Self> {
        let chain = validate_chain(chain)?.into_inner();
        for tx in &pending {
            tx.validate()?;
        }

        let confirmed = confirmed_ids(&chain);
        let pending = pending
            .into_iter()
            .filter(|tx| !confirmed.contains(tx.transaction_id.as_str()))
            .collect();
        Ok(Self { chain, pending })
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Current tip. The chain always holds at least the genesis block.
    pub fn tip(&self) -> &Block {
        // Every constructor seeds or validates a non-empty chain
        &self.chain[self.chain.len() - 1]
    }

    pub fn balances(&self, address: &str) -> Balances {
        balances_of(&self.chain, address)
    }

    /// Admit a transaction to the pending pool after the structural and
    /// confirmed-balance checks. Returns the index of the block it is
    /// expected to land in.
    pub fn enqueue(&mut self, tx: Transaction) -> LedgerResult<u64> {
        tx.validate()?;
        check_spendable(&self.chain, &tx)?;

        debug!(
            transaction_id = %tx.transaction_id,
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = tx.amount,
            token = %tx.token_type,
            "Transaction enqueued"
        );
        self.pending.push(tx);
        Ok(self.chain.len() as u64)
    }

    /// Up to `limit` of the oldest pending transactions
    pub fn pending_prefix(&self, limit: usize) -> Vec<Transaction> {
        self.pending.iter().take(limit).cloned().collect()
    }

    /// Append a validated block and evict every transaction it carries from
    /// the pending pool
    pub fn append(&mut self, block: ValidatedBlock) {
        let block = block.into_inner();
        let included = block_ids(&block);
        let before = self.pending.len();
        self.pending
            .retain(|tx| !included.contains(tx.transaction_id.as_str()));

        info!(
            index = block.index,
            validator = %block.validator,
            transactions = block.transactions.len(),
            evicted = before - self.pending.len(),
            "Block appended"
        );
        self.chain.push(block);
    }

    /// Swap in a validated chain. Pending transactions confirmed anywhere in
    /// the new chain are evicted; the rest stay pending.
    pub fn replace_chain(&mut self, chain: ValidatedChain) {
        let chain = chain.into_inner();
        let confirmed = confirmed_ids(&chain);
        let before = self.pending.len();
        self.pending
            .retain(|tx| !confirmed.contains(tx.transaction_id.as_str()));

        info!(
            old_length = self.chain.len(),
            new_length = chain.len(),
            evicted = before - self.pending.len(),
            "Chain replaced"
        );
        self.chain = chain;
    }
}

fn block_ids(block: &Block) -> HashSet<&str> {
    block
        .transactions
        .iter()
        .map(|tx| tx.transaction_id.as_str())
        .collect()
}

fn confirmed_ids(chain: &[Block]) -> HashSet<&str> {
    chain.iter().flat_map(block_ids).collect()
}
