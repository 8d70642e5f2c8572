use simchain_common::{Balances, Block, LedgerError, LedgerResult, TokenType, Transaction};

/// Balance of `address` in `token`, replayed over every confirmed transaction
/// in chain order. The faucet is never debited.
pub fn balance_of(chain: &[Block], address: &str, token: TokenType) -> i128 {
    confirmed(chain)
        .filter(|tx| tx.token_type == token)
        .fold(0i128, |balance, tx| balance + delta(tx, address))
}

/// Balances of `address` for every token type
pub fn balances_of(chain: &[Block], address: &str) -> Balances {
    let mut balances = Balances::default();
    for tx in confirmed(chain) {
        *balances.get_mut(tx.token_type) += delta(tx, address);
    }
    balances
}

/// Accepts `tx` only if its sender can cover it from confirmed history.
///
/// Pending transactions are not counted here, so two pending debits from the
/// same sender can each pass and overdraw it once both confirm.
pub fn check_spendable(chain: &[Block], tx: &Transaction) -> LedgerResult<()> {
    if tx.is_mint() {
        return Ok(());
    }

    let available = balance_of(chain, &tx.sender, tx.token_type);
    if available < i128::from(tx.amount) {
        return Err(LedgerError::InsufficientBalance {
            sender: tx.sender.clone(),
            token: tx.token_type,
            available,
            requested: tx.amount,
        });
    }
    Ok(())
}

fn confirmed(chain: &[Block]) -> impl Iterator<Item = &Transaction> {
    chain.iter().flat_map(|block| block.transactions.iter())
}

fn delta(tx: &Transaction, address: &str) -> i128 {
    let amount = i128::from(tx.amount);
    let mut delta = 0;
    if tx.recipient == address {
        delta += amount;
    }
    if tx.sender == address && !tx.is_mint() {
        delta -= amount;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_common::FAUCET_ADDRESS;

    fn chain_with(txs: Vec<Transaction>) -> Vec<Block> {
        let genesis = Block::genesis();
        let block = Block::forge(&genesis, "node-a", txs);
        vec![genesis, block]
    }

    #[test]
    fn test_replay_credits_and_debits() {
        let chain = chain_with(vec![
            Transaction::mint("alice", 1000, TokenType::Main),
            Transaction::new("alice", "bob", 250, TokenType::Main),
            Transaction::mint("alice", 40, TokenType::Second),
        ]);

        assert_eq!(balance_of(&chain, "alice", TokenType::Main), 750);
        assert_eq!(balance_of(&chain, "bob", TokenType::Main), 250);
        assert_eq!(balance_of(&chain, "alice", TokenType::Second), 40);

        let balances = balances_of(&chain, "alice");
        assert_eq!(balances, Balances { main: 750, second: 40 });
    }

    #[test]
    fn test_faucet_is_never_debited() {
        let chain = chain_with(vec![Transaction::mint("alice", 1000, TokenType::Main)]);
        assert_eq!(balance_of(&chain, FAUCET_ADDRESS, TokenType::Main), 0);
    }

    #[test]
    fn test_self_transfer_is_neutral() {
        let chain = chain_with(vec![
            Transaction::mint("alice", 10, TokenType::Main),
            Transaction::new("alice", "alice", 10, TokenType::Main),
        ]);
        assert_eq!(balance_of(&chain, "alice", TokenType::Main), 10);
    }

    #[test]
    fn test_spend_check_boundary() {
        let chain = chain_with(vec![Transaction::mint("alice", 100, TokenType::Main)]);

        let exact = Transaction::new("alice", "bob", 100, TokenType::Main);
        assert!(check_spendable(&chain, &exact).is_ok());

        let over = Transaction::new("alice", "bob", 101, TokenType::Main);
        assert_eq!(
            check_spendable(&chain, &over),
            Err(LedgerError::InsufficientBalance {
                sender: "alice".to_string(),
                token: TokenType::Main,
                available: 100,
                requested: 101,
            })
        );

        // Balances are tracked per token
        let other_token = Transaction::new("alice", "bob", 1, TokenType::Second);
        assert!(check_spendable(&chain, &other_token).is_err());

        let mint = Transaction::mint("bob", u64::MAX, TokenType::Second);
        assert!(check_spendable(&chain, &mint).is_ok());
    }
}
