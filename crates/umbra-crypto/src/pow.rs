//! Proof-of-work helpers.
//!
//! The target is a count of leading `'0'` hex characters in the block's
//! double-SHA-256 hash. Difficulty is fixed at node construction; there is
//! no retargeting.

use umbra_core::block::Block;
use umbra_core::types::Hash256;

use crate::hash::block_hash;

/// Returns `true` if `hash` starts with `difficulty` `'0'` hex characters.
pub fn hash_meets_difficulty(hash: &Hash256, difficulty: usize) -> bool {
    let s = hash.as_str().as_bytes();
    s.len() >= difficulty && s.iter().take(difficulty).all(|&b| b == b'0')
}

/// Mine `block` in place: increment the nonce from 0 until the recomputed
/// hash meets `difficulty`, then store the winning hash.
///
/// Single-threaded and non-preemptible; callers that must not stall run it
/// on a blocking worker.
pub fn mine_block(block: &mut Block, difficulty: usize) {
    block.nonce = 0;
    loop {
        let hash = block_hash(block);
        if hash_meets_difficulty(&hash, difficulty) {
            block.hash = hash;
            return;
        }
        block.nonce += 1;
    }
}

/// Re-verify a block's stored proof-of-work: the hash must recompute exactly
/// and carry the difficulty prefix.
pub fn verify_block_pow(block: &Block, difficulty: usize) -> bool {
    block.hash == block_hash(block) && hash_meets_difficulty(&block.hash, difficulty)
}
