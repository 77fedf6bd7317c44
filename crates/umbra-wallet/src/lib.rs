//! umbra-wallet
//!
//! Wallets own a P-384 keypair and know how to spend: transparent transfers
//! get a per-transaction ECDSA signature, anonymous transfers get inputs
//! selected from the UTXO set, a key image, and (directory permitting) a
//! ring signature. The on-disk registry is a single `wallets.json`.

pub mod store;
pub mod wallet;

pub use store::{WalletRecord, WalletStore};
pub use wallet::Wallet;
