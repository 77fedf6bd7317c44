use sha2::{Digest, Sha256};

use umbra_core::block::Block;
use umbra_core::transaction::Transaction;
use umbra_core::types::Hash256;

/// SHA-256 of arbitrary bytes → lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 applied twice (inner digest fed to the outer as raw bytes) →
/// lowercase hex. Block hashes use this.
pub fn double_sha256_hex(data: &[u8]) -> String {
    let inner = Sha256::digest(data);
    hex::encode(Sha256::digest(inner))
}

/// Transaction ID: SHA-256 of the canonical ID preimage.
pub fn transaction_id(tx: &Transaction) -> Hash256 {
    Hash256::new(sha256_hex(&tx.id_bytes()))
}

/// Block hash: double SHA-256 of the canonical header preimage.
pub fn block_hash(block: &Block) -> Hash256 {
    Hash256::new(double_sha256_hex(block.preimage().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn txid_ignores_signing() {
        let mut tx = Transaction::standard("ab".into(), 5.0, None, 1_700_000_000);
        let id = transaction_id(&tx);
        tx.sender_pubkey = Some("deadbeef".into());
        // sender_pubkey is part of identity, so the ID moves…
        assert_ne!(transaction_id(&tx), id);
        let id = transaction_id(&tx);
        // …but attaching the signature does not.
        tx.signature = Some("sig".into());
        assert_eq!(transaction_id(&tx), id);
    }
}
