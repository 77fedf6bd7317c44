//! ─── Umbra protocol constants ───────────────────────────────────────────────
//!
//! Emission is coinbase-only: no fees, miners earn the block subsidy plus
//! the periodic anonymity bonus. Difficulty is fixed at node construction.

use crate::types::Amount;

// ── Supply & emission ────────────────────────────────────────────────────────

/// Hard cap on the sum of all coinbase outputs, genesis included.
pub const MAX_SUPPLY: Amount = 33_000_000.0;

/// Block subsidy before the first halving.
pub const DEFAULT_REWARD: Amount = 50.0;

/// Every `HALVING_INTERVAL`-th block halves the subsidy (floor, min 1).
pub const HALVING_INTERVAL: u64 = 5_000;

/// Every `ANON_BLOCK_INTERVAL`-th block is an anonymity-bonus block: its
/// coinbase carries marker metadata and `BONUS_REWARD` extra units.
pub const ANON_BLOCK_INTERVAL: u64 = 333;

/// Extra subsidy on anonymity-bonus blocks.
pub const BONUS_REWARD: Amount = 5.0;

// ── Proof-of-Work ────────────────────────────────────────────────────────────

/// Leading `'0'` hex characters required of a block hash.
pub const DEFAULT_DIFFICULTY: usize = 3;

// ── Privacy ──────────────────────────────────────────────────────────────────

/// Ring member count for anonymous transactions (signer included).
pub const RING_SIZE: usize = 5;

/// Sentinel stored as "ANONYMOUS" sender on ring-signed transactions.
pub const ANONYMOUS_SENDER: &str = "ANONYMOUS";

// ── Genesis ──────────────────────────────────────────────────────────────────

/// Bootstrap address credited by the genesis coinbase.
pub const GENESIS_ADDRESS: &str =
    "d26cdabf6cb8022ed0f537272e8e9921998eb2a70d1bbcdeff7f5dd6bf4c6db1";

/// Units minted to the bootstrap address at genesis.
pub const GENESIS_SUPPLY: Amount = 3_333_666.0;

/// Sentinel signature carried by the genesis coinbase.
pub const GENESIS_SIGNATURE: &str = "umbra-genesis";

// ── Validation ───────────────────────────────────────────────────────────────

/// Slack for floating-point amount comparisons in UTXO validation.
pub const AMOUNT_EPSILON: Amount = 1e-9;

// ── Peer protocol ────────────────────────────────────────────────────────────

/// Fixed back-off between outbound peer reconnect attempts.
pub const PEER_RECONNECT_SECS: u64 = 5;

/// Keep-alive ping interval per peer session.
pub const PEER_PING_INTERVAL_SECS: u64 = 20;

/// A session with no traffic for this long past the ping is considered dead.
pub const PEER_PING_TIMEOUT_SECS: u64 = 20;
