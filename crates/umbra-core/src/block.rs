use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::types::{Hash256, Timestamp};

/// A mined block: header fields plus the ordered transaction list.
///
/// The stored `hash` is hex double-SHA-256 of [`Block::preimage`] and must
/// carry the difficulty prefix; both are re-verified during chain validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash256,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    #[serde(default)]
    pub manifest: Option<String>,
    pub hash: Hash256,
}

impl Block {
    /// An unmined block at `index` extending `previous_hash`. `nonce` and
    /// `hash` are filled in by the proof-of-work loop.
    pub fn new(
        index: u64,
        previous_hash: Hash256,
        timestamp: Timestamp,
        transactions: Vec<Transaction>,
        manifest: Option<String>,
    ) -> Self {
        Self {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            manifest,
            hash: Hash256::placeholder(),
        }
    }

    /// The canonical string the block hash commits to:
    /// `index ‖ previous_hash ‖ timestamp ‖ concat(tx consensus JSON) ‖ nonce ‖ manifest`.
    ///
    /// Transactions contribute their consensus form, which excludes output
    /// identities — those are assigned when the block is applied, after the
    /// hash is fixed.
    pub fn preimage(&self) -> String {
        let txs: String = self.transactions.iter().map(|tx| tx.consensus_json()).collect();
        format!(
            "{}{}{}{}{}{}",
            self.index,
            self.previous_hash,
            self.timestamp,
            txs,
            self.nonce,
            self.manifest.as_deref().unwrap_or("")
        )
    }
}
