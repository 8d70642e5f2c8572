use serde::{Deserialize, Serialize};
use simchain_common::{Block, Transaction};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::ledger::stake::StakeTable;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt snapshot {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Everything a node needs to resume after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub node_id: String,
    pub chain: Vec<Block>,
    #[serde(default)]
    pub pending_transactions: Vec<Transaction>,
    #[serde(default)]
    pub peers: BTreeSet<String>,
    pub stakes: StakeTable,
    #[serde(default)]
    pub known_wallets: BTreeSet<String>,
}

/// Reads and writes the per-node JSON snapshot
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    path: PathBuf,
}

impl PersistenceManager {
    pub fn new(data_dir: impl AsRef<Path>, node_id: &str) -> Self {
        let file_name = format!("node_{}.json", sanitize(node_id));
        Self {
            path: data_dir.as_ref().join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot if one exists. A missing file is a fresh start; a
    /// file that cannot be parsed is reported as corrupt.
    pub fn load(&self) -> PersistenceResult<Option<Snapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot found, starting fresh");
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| PersistenceError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        info!(
            path = %self.path.display(),
            chain_length = snapshot.chain.len(),
            pending = snapshot.pending_transactions.len(),
            peers = snapshot.peers.len(),
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    /// Write the snapshot atomically: a temporary sibling file is written and
    /// synced, then renamed over the previous snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).map_err(|e| self.io_error(e))?;
        file.write_all(&data).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(
            path = %self.path.display(),
            chain_length = snapshot.chain.len(),
            bytes = data.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Keep identifiers such as `127.0.0.1:5000` file-system safe
fn sanitize(node_id: &str) -> String {
    node_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_common::TokenType;

    fn create_test_snapshot() -> Snapshot {
        let genesis = Block::genesis();
        let block = Block::forge(
            &genesis,
            "127.0.0.1:5000",
            vec![Transaction::mint("alice", 1000, TokenType::Main)],
        );

        let mut stakes = StakeTable::new();
        stakes.set("127.0.0.1:5000", 100);
        stakes.set("127.0.0.1:5001", 50);

        Snapshot {
            node_id: "127.0.0.1:5000".to_string(),
            chain: vec![genesis, block],
            pending_transactions: vec![Transaction::mint("bob", 5, TokenType::Second)],
            peers: BTreeSet::from(["127.0.0.1:5001".to_string()]),
            stakes,
            known_wallets: BTreeSet::from(["wallet-1".to_string()]),
        }
    }

    #[test]
    fn test_file_name_is_sanitized() {
        let manager = PersistenceManager::new("/tmp/data", "127.0.0.1:5000");
        assert_eq!(manager.path(), Path::new("/tmp/data/node_127.0.0.1_5000.json"));
    }

    #[test]
    fn test_missing_snapshot_is_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path(), "node-a");
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path().join("nested"), "node-a");
        let snapshot = create_test_snapshot();

        manager.save(&snapshot).unwrap();
        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(loaded.chain.iter().all(Block::has_valid_hash));

        // Overwrites leave no temporary file behind
        manager.save(&snapshot).unwrap();
        let entries = fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_garbage_snapshot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path(), "node-a");
        fs::write(manager.path(), "{ not json").unwrap();

        assert!(matches!(manager.load(), Err(PersistenceError::Corrupt { .. })));
    }

    #[test]
    fn test_optional_sections_default() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path(), "node-a");
        let json = serde_json::json!({
            "node_id": "node-a",
            "chain": [Block::genesis()],
            "stakes": { "node-a": 100 }
        });
        fs::write(manager.path(), json.to_string()).unwrap();

        let loaded = manager.load().unwrap().unwrap();
        assert!(loaded.pending_transactions.is_empty());
        assert!(loaded.known_wallets.is_empty());
        assert_eq!(loaded.stakes.get("node-a"), Some(100));
    }
}
