//! Derived spend state: the UTXO index and the key-image registry.
//!
//! Both are rebuildable from genesis by replaying the chain; nothing here is
//! authoritative on its own.

use std::collections::{HashMap, HashSet};

use umbra_core::transaction::TxOutput;
use umbra_core::types::{Address, Hash256, Outpoint};

// ── UtxoSet ──────────────────────────────────────────────────────────────────

/// In-memory index of unspent outputs keyed by `(txid, output_index)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UtxoSet {
    map: HashMap<Outpoint, TxOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an output under its assigned `(txid, index)` identity.
    pub fn insert(&mut self, output: TxOutput) {
        self.map.insert((output.txid.clone(), output.index), output);
    }

    pub fn get(&self, outpoint: &Outpoint) -> Option<&TxOutput> {
        self.map.get(outpoint)
    }

    pub fn remove(&mut self, outpoint: &Outpoint) -> Option<TxOutput> {
        self.map.remove(outpoint)
    }

    pub fn contains(&self, outpoint: &Outpoint) -> bool {
        self.map.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Outputs credited to `address`, ordered by outpoint so wallets see a
    /// deterministic first-fit sequence.
    pub fn unspent_for(&self, address: &Address) -> Vec<TxOutput> {
        let mut outputs: Vec<TxOutput> = self
            .map
            .values()
            .filter(|o| &o.address == address)
            .cloned()
            .collect();
        outputs.sort_by(|a, b| (&a.txid, a.index).cmp(&(&b.txid, b.index)));
        outputs
    }
}

// ── KeyImageSet ──────────────────────────────────────────────────────────────

/// Every key image that has appeared on an applied anonymous transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyImageSet {
    set: HashSet<Hash256>,
}

impl KeyImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the image was already present.
    pub fn insert(&mut self, image: Hash256) -> bool {
        self.set.insert(image)
    }

    pub fn contains(&self, image: &Hash256) -> bool {
        self.set.contains(image)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(txid: &str, index: u32, address: &str, amount: f64) -> TxOutput {
        TxOutput {
            txid: Hash256::new(txid.into()),
            index,
            address: Address::new(address.into()),
            amount,
        }
    }

    #[test]
    fn insert_get_remove() {
        let mut set = UtxoSet::new();
        set.insert(output("aa", 0, "addr", 10.0));
        let key = (Hash256::new("aa".into()), 0);
        assert!(set.contains(&key));
        assert_eq!(set.remove(&key).unwrap().amount, 10.0);
        assert!(!set.contains(&key));
    }

    #[test]
    fn unspent_for_is_sorted_and_filtered() {
        let mut set = UtxoSet::new();
        set.insert(output("bb", 1, "mine", 2.0));
        set.insert(output("aa", 0, "mine", 1.0));
        set.insert(output("cc", 0, "theirs", 9.0));

        let mine = set.unspent_for(&Address::new("mine".into()));
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].txid.as_str(), "aa");
        assert_eq!(mine[1].txid.as_str(), "bb");
    }

    #[test]
    fn key_image_set_rejects_repeats() {
        let mut set = KeyImageSet::new();
        assert!(set.insert(Hash256::new("img".into())));
        assert!(!set.insert(Hash256::new("img".into())));
        assert!(set.contains(&Hash256::new("img".into())));
    }
}
