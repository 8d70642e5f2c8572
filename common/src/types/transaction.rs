use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::{TokenType, FAUCET_ADDRESS};
use super::unix_timestamp;
use crate::error::ValidationError;

/// A confirmed or pending token transfer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Debited address, or the faucet sentinel when minting
    pub sender: String,
    /// Credited address
    pub recipient: String,
    /// Positive number of token units
    pub amount: u64,
    /// Denomination being moved
    #[serde(default)]
    pub token_type: TokenType,
    /// Creation time as Unix seconds
    pub timestamp: f64,
    /// Unique identifier used to evict the transaction from pending pools
    pub transaction_id: String,
}

impl Transaction {
    /// Creates a transaction stamped with the current time and a fresh id
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        token_type: TokenType,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            token_type,
            timestamp: unix_timestamp(),
            transaction_id: Uuid::new_v4().to_string(),
        }
    }

    /// Creates a mint from the faucet
    pub fn mint(recipient: impl Into<String>, amount: u64, token_type: TokenType) -> Self {
        Self::new(FAUCET_ADDRESS, recipient, amount, token_type)
    }

    pub fn is_mint(&self) -> bool {
        self.sender == FAUCET_ADDRESS
    }

    /// Structural check applied to every transaction entering the node
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sender.trim().is_empty() {
            return Err(ValidationError::MissingField("sender"));
        }
        if self.recipient.trim().is_empty() {
            return Err(ValidationError::MissingField("recipient"));
        }
        if self.transaction_id.trim().is_empty() {
            return Err(ValidationError::MissingField("transaction_id"));
        }
        if self.amount == 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(ValidationError::InvalidTimestamp("transaction"));
        }
        Ok(())
    }
}

/// Client-facing submission. The node stamps time and id on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    #[serde(default)]
    pub token_type: TokenType,
}

impl TransactionRequest {
    /// Validates the request and turns it into a stamped transaction
    pub fn into_transaction(self) -> Result<Transaction, ValidationError> {
        let tx = Transaction::new(self.sender, self.recipient, self.amount, self.token_type);
        tx.validate()?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_is_stamped() {
        let a = Transaction::new("alice", "bob", 10, TokenType::Main);
        let b = Transaction::new("alice", "bob", 10, TokenType::Main);

        assert!(a.timestamp > 0.0);
        assert_ne!(a.transaction_id, b.transaction_id);
        assert!(a.validate().is_ok());
        assert!(!a.is_mint());
        assert!(Transaction::mint("bob", 5, TokenType::Second).is_mint());
    }

    #[test]
    fn test_validation_rejects_bad_fields() {
        let mut tx = Transaction::new("alice", "bob", 10, TokenType::Main);
        tx.amount = 0;
        assert_eq!(tx.validate(), Err(ValidationError::NonPositiveAmount));

        let mut tx = Transaction::new("", "bob", 10, TokenType::Main);
        assert_eq!(tx.validate(), Err(ValidationError::MissingField("sender")));
        tx.sender = "alice".to_string();
        tx.recipient = "   ".to_string();
        assert_eq!(tx.validate(), Err(ValidationError::MissingField("recipient")));
    }

    #[test]
    fn test_request_defaults_to_main_token() {
        let request: TransactionRequest =
            serde_json::from_str(r#"{"sender":"0","recipient":"a","amount":1000}"#).unwrap();
        assert_eq!(request.token_type, TokenType::Main);

        let tx = request.into_transaction().unwrap();
        assert!(tx.is_mint());
        assert_eq!(tx.amount, 1000);
    }

    #[test]
    fn test_request_rejects_non_integer_amounts() {
        assert!(serde_json::from_str::<TransactionRequest>(
            r#"{"sender":"a","recipient":"b","amount":1.5}"#
        )
        .is_err());
        assert!(serde_json::from_str::<TransactionRequest>(
            r#"{"sender":"a","recipient":"b","amount":-3}"#
        )
        .is_err());

        let zero = TransactionRequest {
            sender: "a".to_string(),
            recipient: "b".to_string(),
            amount: 0,
            token_type: TokenType::Second,
        };
        assert_eq!(zero.into_transaction(), Err(ValidationError::NonPositiveAmount));
    }
}
