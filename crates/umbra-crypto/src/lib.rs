//! umbra-crypto
//!
//! The consensus-critical primitives: SHA-256 hashing over canonical JSON,
//! ECDSA over NIST P-384 with SHA-256 prehash, the leading-zero-hex
//! proof-of-work, and the simplified ring-signature / key-image scheme.

pub mod hash;
pub mod keys;
pub mod pow;
pub mod ring;
pub mod verify;

pub use hash::{block_hash, double_sha256_hex, sha256_hex, transaction_id};
pub use keys::{address_from_pubkey_bytes, address_from_pubkey_hex, verify_ecdsa, KeyPair};
pub use pow::{hash_meets_difficulty, mine_block, verify_block_pow};
pub use ring::{create_ring_signature, key_image, verify_ring_signature, KeyDirectory};
pub use verify::{sender_address, verify_transaction};
