use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stake weights keyed by peer identifier.
///
/// Weights only bias validator selection; nothing is locked or slashed.
/// Entries are kept in identifier order so every node walks them the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakeTable {
    stakes: BTreeMap<String, u64>,
}

impl StakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.stakes.get(id).copied()
    }

    /// Inserts `stake` for `id` unless the identifier is already known.
    /// Returns whether an entry was added.
    pub fn ensure(&mut self, id: &str, stake: u64) -> bool {
        if self.stakes.contains_key(id) {
            return false;
        }
        self.stakes.insert(id.to_string(), stake);
        true
    }

    pub fn set(&mut self, id: &str, stake: u64) {
        self.stakes.insert(id.to_string(), stake);
    }

    /// Entries with a positive weight, in identifier order
    pub fn eligible(&self) -> impl Iterator<Item = (&str, u64)> {
        self.stakes
            .iter()
            .filter(|(_, stake)| **stake > 0)
            .map(|(id, stake)| (id.as_str(), *stake))
    }

    pub fn total_stake(&self) -> u128 {
        self.stakes.values().map(|s| u128::from(*s)).sum()
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let mut table = StakeTable::new();
        assert!(table.ensure("node-a", 100));
        assert!(!table.ensure("node-a", 50));
        assert_eq!(table.get("node-a"), Some(100));
    }

    #[test]
    fn test_eligible_skips_zero_stake() {
        let mut table = StakeTable::new();
        table.set("b", 0);
        table.set("c", 7);
        table.set("a", 3);

        let eligible: Vec<_> = table.eligible().collect();
        assert_eq!(eligible, vec![("a", 3), ("c", 7)]);
        assert_eq!(table.total_stake(), 10);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut table = StakeTable::new();
        table.set("127.0.0.1:5000", 100);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"127.0.0.1:5000":100}"#);
        assert_eq!(serde_json::from_str::<StakeTable>(&json).unwrap(), table);
    }
}
