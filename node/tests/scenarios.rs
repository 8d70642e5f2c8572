mod common;

use common::{forge, spawn_node, InMemoryNetwork};
use simchain_common::{IntegrityError, LedgerError, TokenType, TransactionRequest, FAUCET_ADDRESS};
use tempfile::TempDir;

const NODE_X: &str = "127.0.0.1:5000";
const NODE_Y: &str = "127.0.0.1:5001";

fn transfer(sender: &str, recipient: &str, amount: u64) -> TransactionRequest {
    TransactionRequest {
        sender: sender.to_string(),
        recipient: recipient.to_string(),
        amount,
        token_type: TokenType::Main,
    }
}

#[test]
fn faucet_mint_is_spendable_after_one_round() {
    let dir = TempDir::new().unwrap();
    let node = spawn_node(&InMemoryNetwork::new(), &dir, NODE_X);

    let index = node
        .submit_transaction(transfer(FAUCET_ADDRESS, "A", 1000))
        .unwrap();
    assert_eq!(index, 1);
    assert_eq!(node.get_balance("A").main, 0);

    forge(&node);
    assert_eq!(node.get_balance("A").main, 1000);
    assert_eq!(node.get_balance(FAUCET_ADDRESS).main, 0);
    assert!(node.pending_transactions().is_empty());
}

#[test]
fn confirmed_transfer_moves_balance() {
    let dir = TempDir::new().unwrap();
    let node = spawn_node(&InMemoryNetwork::new(), &dir, NODE_X);
    node.submit_transaction(transfer(FAUCET_ADDRESS, "A", 1000))
        .unwrap();
    forge(&node);

    node.submit_transaction(transfer("A", "B", 250)).unwrap();
    forge(&node);

    assert_eq!(node.get_balance("A").main, 750);
    assert_eq!(node.get_balance("B").main, 250);
    assert_eq!(node.get_balance("B").second, 0);
}

#[test]
fn overspend_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let node = spawn_node(&InMemoryNetwork::new(), &dir, NODE_X);
    node.submit_transaction(transfer(FAUCET_ADDRESS, "A", 750))
        .unwrap();
    forge(&node);

    let length = node.chain_len();
    let result = node.submit_transaction(transfer("A", "B", 900));
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance {
            available: 750,
            requested: 900,
            ..
        })
    ));
    assert_eq!(node.chain_len(), length);
    assert!(node.pending_transactions().is_empty());

    // Spending the exact balance is allowed
    assert!(node.submit_transaction(transfer("A", "B", 750)).is_ok());
}

#[tokio::test]
async fn resolve_adopts_strictly_longer_valid_chain() {
    let network = InMemoryNetwork::new();
    let (dir_x, dir_y) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let x = spawn_node(&network, &dir_x, NODE_X);
    let y = spawn_node(&network, &dir_y, NODE_Y);

    for _ in 0..2 {
        forge(&x);
    }
    for _ in 0..4 {
        forge(&y);
    }
    assert_eq!(x.chain_len(), 3);
    assert_eq!(y.chain_len(), 5);

    let report = x.register_peers([format!("http://{NODE_Y}")]);
    assert_eq!(report.added, vec![NODE_Y.to_string()]);

    assert!(x.resolve().await);
    assert_eq!(x.get_chain(), y.get_chain());
    assert_eq!(x.chain_len(), 5);

    // Equal length never replaces
    assert!(!x.resolve().await);
}

#[tokio::test]
async fn resolve_keeps_local_chain_against_shorter_or_equal_peers() {
    let network = InMemoryNetwork::new();
    let (dir_x, dir_y) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let x = spawn_node(&network, &dir_x, NODE_X);
    let y = spawn_node(&network, &dir_y, NODE_Y);

    forge(&x);
    forge(&x);
    forge(&y);
    forge(&y);
    let local = x.get_chain();

    x.register_peers([NODE_Y, "127.0.0.1:5999"]);
    assert!(!x.resolve().await);
    assert_eq!(x.get_chain(), local);
}

#[test]
fn tampered_block_is_rejected() {
    let network = InMemoryNetwork::new();
    let (dir_x, dir_y) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let x = spawn_node(&network, &dir_x, NODE_X);
    let y = spawn_node(&network, &dir_y, NODE_Y);

    let mut block = forge(&y);
    block.hash = "a".repeat(64);

    x.submit_transaction(transfer(FAUCET_ADDRESS, "alice", 10))
        .unwrap();
    let pending = x.pending_transactions();

    assert!(matches!(
        x.receive_block(block.clone()),
        Err(LedgerError::ChainIntegrity(IntegrityError::HashMismatch { index: 1, .. }))
    ));
    assert_eq!(x.chain_len(), 1);
    assert_eq!(x.pending_transactions(), pending);

    // The untouched block is accepted
    let original = y.get_chain().chain[1].clone();
    assert!(x.receive_block(original).is_ok());
    assert_eq!(x.chain_len(), 2);
}

#[test]
fn out_of_sequence_block_is_rejected() {
    let network = InMemoryNetwork::new();
    let (dir_x, dir_y) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let x = spawn_node(&network, &dir_x, NODE_X);
    let y = spawn_node(&network, &dir_y, NODE_Y);

    forge(&y);
    let second = forge(&y);

    x.submit_transaction(transfer(FAUCET_ADDRESS, "alice", 10))
        .unwrap();
    let pending = x.pending_transactions();

    assert!(matches!(
        x.receive_block(second),
        Err(LedgerError::ChainIntegrity(IntegrityError::IndexMismatch {
            expected: 1,
            received: 2
        }))
    ));
    assert_eq!(x.chain_len(), 1);
    assert_eq!(x.pending_transactions(), pending);
}

#[tokio::test]
async fn forged_blocks_reach_registered_peers() {
    let network = InMemoryNetwork::new();
    let (dir_x, dir_y) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let x = spawn_node(&network, &dir_x, NODE_X);
    let y = spawn_node(&network, &dir_y, NODE_Y);

    x.submit_transaction(transfer(FAUCET_ADDRESS, "A", 10)).unwrap();
    let block = forge(&x);
    // Registered after forging so x stays the only staked validator above
    x.register_peers([NODE_Y]);
    let report = x.broadcast_block(&block).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(y.chain_len(), 2);
    assert_eq!(y.get_balance("A").main, 10);

    // Re-delivery is rejected by index and reported as a failure
    let report = x.broadcast_block(&block).await;
    assert_eq!(report.failed, 1);
    assert_eq!(y.chain_len(), 2);
}
