use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sender address reserved for minting. It is never debited and never
/// balance-checked.
pub const FAUCET_ADDRESS: &str = "0";

/// Display name of the MAIN token
pub const TOKEN_NAME: &str = "SIMCOIN";

/// The two token denominations carried by every transaction
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    /// The primary token, used for miner rewards
    #[default]
    Main,
    /// The secondary token
    Second,
}

impl TokenType {
    pub const ALL: [TokenType; 2] = [TokenType::Main, TokenType::Second];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Main => "MAIN",
            TokenType::Second => "SECOND",
        }
    }

    /// Single-byte tag used by the canonical block encoding
    pub(crate) fn tag(&self) -> u8 {
        match self {
            TokenType::Main => 0,
            TokenType::Second => 1,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAIN" => Ok(TokenType::Main),
            "SECOND" => Ok(TokenType::Second),
            other => Err(format!("unknown token type '{other}' (expected MAIN or SECOND)")),
        }
    }
}

/// Per-token balances of one address, derived by replaying the chain.
///
/// Values are signed: two pending debits that were each individually covered
/// can overdraw a sender once both confirm, and the replay reports that as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    #[serde(rename = "MAIN")]
    pub main: i128,
    #[serde(rename = "SECOND")]
    pub second: i128,
}

impl Balances {
    pub fn get(&self, token: TokenType) -> i128 {
        match token {
            TokenType::Main => self.main,
            TokenType::Second => self.second,
        }
    }

    pub fn get_mut(&mut self, token: TokenType) -> &mut i128 {
        match token {
            TokenType::Main => &mut self.main,
            TokenType::Second => &mut self.second,
        }
    }
}
