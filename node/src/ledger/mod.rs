pub mod balance;
pub mod stake;
pub mod store;

pub use balance::{balance_of, balances_of, check_spendable};
pub use stake::StakeTable;
pub use store::LedgerStore;
