pub mod forger;
pub mod selection;
pub mod validator;

pub use forger::{Forger, ForgerStats, RoundOutcome};
pub use selection::{select_validator, Selection};
pub use validator::{validate_block, validate_chain, ValidatedBlock, ValidatedChain};
