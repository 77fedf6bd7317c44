//! Simplified ring signatures and key images.
//!
//! A ring is one real ECDSA signature by the spender plus `n-1` signatures
//! made by freshly generated throwaway keys, shuffled together. Every pair
//! must verify; at least one ring public key must be registered in the
//! [`KeyDirectory`]. Decoy keys are not registered, so a determined observer
//! can tell them apart — this scheme hides the sender among directory
//! members, not against a strong adversary.
//!
//! The key image binds a spend to `(secret key, consumed outpoints)` so the
//! same anonymous spend can never be applied twice, ring or no ring.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use umbra_core::error::UmbraError;
use umbra_core::transaction::{RingSignature, TxInput};
use umbra_core::types::{Address, Hash256};

use crate::keys::{address_from_pubkey_hex, verify_ecdsa, KeyPair};

// ── KeyDirectory ─────────────────────────────────────────────────────────────

/// The address → public-key registry consulted by ring verification.
///
/// Passed explicitly wherever it is needed; the mempool, engine and peer
/// server must all share one instance.
#[derive(Clone, Debug, Default)]
pub struct KeyDirectory {
    keys: BTreeMap<Address, String>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public key; returns the derived address.
    pub fn register(&mut self, pubkey_hex: &str) -> Result<Address, UmbraError> {
        let address =
            address_from_pubkey_hex(pubkey_hex).map_err(|e| UmbraError::Crypto(e.to_string()))?;
        self.keys.insert(address.clone(), pubkey_hex.to_string());
        Ok(address)
    }

    pub fn pubkey_of(&self, address: &Address) -> Option<&str> {
        self.keys.get(address).map(|s| s.as_str())
    }

    /// Whether `pubkey_hex` belongs to a registered wallet.
    pub fn contains_pubkey(&self, pubkey_hex: &str) -> bool {
        match address_from_pubkey_hex(pubkey_hex) {
            Ok(addr) => self.keys.get(&addr).map(|k| k == pubkey_hex).unwrap_or(false),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ── Ring construction / verification ─────────────────────────────────────────

/// Build a ring signature over `message`: the signer's real signature at a
/// random position, padded to `ring_size` with throwaway-key signatures.
pub fn create_ring_signature(
    message: &[u8],
    signer: &KeyPair,
    ring_size: usize,
) -> RingSignature {
    let n = ring_size.max(2);
    let own_at = rand::thread_rng().gen_range(0..n);

    let mut sigs = Vec::with_capacity(n);
    let mut pubkeys = Vec::with_capacity(n);
    for i in 0..n {
        if i == own_at {
            sigs.push(signer.sign(message));
            pubkeys.push(signer.public_key_hex());
        } else {
            // Decoy: a fresh key signs and is immediately dropped.
            let decoy = KeyPair::generate();
            sigs.push(decoy.sign(message));
            pubkeys.push(decoy.public_key_hex());
        }
    }
    RingSignature { sigs, pubkeys }
}

/// Verify a ring signature over `message`.
///
/// Every `(sig, pubkey)` pair must verify as ECDSA, and at least one ring
/// member must be a registered wallet — otherwise the ring proves nothing
/// about anyone the node knows.
pub fn verify_ring_signature(
    message: &[u8],
    ring: &RingSignature,
    directory: &KeyDirectory,
) -> Result<(), UmbraError> {
    if ring.is_empty() || ring.sigs.len() != ring.pubkeys.len() {
        return Err(UmbraError::InvalidSignature);
    }
    let mut registered = 0usize;
    for (sig, pubkey) in ring.sigs.iter().zip(&ring.pubkeys) {
        verify_ecdsa(pubkey, message, sig).map_err(|_| UmbraError::InvalidSignature)?;
        if directory.contains_pubkey(pubkey) {
            registered += 1;
        }
    }
    if registered == 0 {
        return Err(UmbraError::InvalidSignature);
    }
    Ok(())
}

// ── Key image ────────────────────────────────────────────────────────────────

/// `SHA-256(secret ‖ concat(prev_txid ‖ output_index))` — deterministic per
/// (key, consumed-outpoints) pair, unlinkable to the address without the
/// secret.
pub fn key_image(secret_bytes: &[u8], inputs: &[TxInput]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(secret_bytes);
    for input in inputs {
        hasher.update(input.prev_txid.as_str().as_bytes());
        hasher.update(input.output_index.to_be_bytes());
    }
    Hash256::new(hex::encode(hasher.finalize()))
}
