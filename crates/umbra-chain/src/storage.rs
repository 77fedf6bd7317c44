use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use umbra_core::block::Block;
use umbra_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_REWARD};
use umbra_core::error::UmbraError;
use umbra_core::transaction::Transaction;
use umbra_core::types::Amount;

use crate::engine::Blockchain;

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_reward() -> Amount {
    DEFAULT_REWARD
}

/// The `blockchain.json` document. Older files held a bare block array;
/// both shapes load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDocument {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub pending_transactions: Vec<Transaction>,
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_reward")]
    pub rewards: Amount,
}

impl ChainDocument {
    /// Capture the persistable view of a chain engine.
    pub fn snapshot(bc: &Blockchain) -> Self {
        Self {
            chain: bc.chain.clone(),
            pending_transactions: bc.pending.clone(),
            difficulty: bc.difficulty,
            rewards: bc.current_reward(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredChain {
    Document(ChainDocument),
    Bare(Vec<Block>),
}

/// Whole-file JSON persistence for the chain. Every save replaces the file.
pub struct ChainStore {
    path: PathBuf,
}

impl ChainStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Load the stored chain; `None` means fresh state (missing or empty
    /// file).
    pub fn load(&self) -> Result<Option<ChainDocument>, UmbraError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let doc = match serde_json::from_str::<StoredChain>(&raw)? {
            StoredChain::Document(doc) => doc,
            StoredChain::Bare(chain) => ChainDocument {
                chain,
                pending_transactions: Vec::new(),
                difficulty: DEFAULT_DIFFICULTY,
                rewards: DEFAULT_REWARD,
            },
        };
        Ok(Some(doc))
    }

    pub fn save(&self, doc: &ChainDocument) -> Result<(), UmbraError> {
        let json = serde_json::to_string(doc)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::types::Address;

    #[test]
    fn document_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChainStore::new(dir.path().join("blockchain.json"));

        let mut bc = Blockchain::new(1);
        bc.mine_pending(&Address::new("m".repeat(64)), None).unwrap();
        store.save(&ChainDocument::snapshot(&bc)).unwrap();

        let doc = store.load().unwrap().expect("document present");
        assert_eq!(doc.chain.len(), 2);
        assert_eq!(doc.difficulty, 1);

        let restored = Blockchain::from_parts(doc.chain, doc.pending_transactions, doc.difficulty)
            .unwrap();
        assert_eq!(restored.height(), 2);
        assert_eq!(restored.total_supply(), bc.total_supply());
        assert!(restored.is_chain_valid());
    }

    #[test]
    fn bare_array_shape_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blockchain.json");
        let bc = Blockchain::new(1);
        std::fs::write(&path, serde_json::to_string(&bc.chain).unwrap()).unwrap();

        let doc = ChainStore::new(&path).load().unwrap().expect("document present");
        assert_eq!(doc.chain.len(), 1);
        assert_eq!(doc.difficulty, DEFAULT_DIFFICULTY);
    }

    #[test]
    fn missing_or_empty_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChainStore::new(dir.path().join("blockchain.json"));
        assert!(store.load().unwrap().is_none());

        std::fs::write(dir.path().join("blockchain.json"), "  \n").unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
