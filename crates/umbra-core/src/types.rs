use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount. Amounts on the wire are non-negative reals; UTXO-level
/// comparisons use [`crate::constants::AMOUNT_EPSILON`].
pub type Amount = f64;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// A UTXO reference: `(txid, output_index)`.
pub type Outpoint = (Hash256, u32);

// ── Hash256 ──────────────────────────────────────────────────────────────────

/// A 64-character lowercase hex SHA-256 digest: transaction IDs, block
/// hashes and key images. The genesis `previous_hash` sentinel `"0"` and the
/// empty placeholder on unassigned outputs are the only non-digest values.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash256(pub String);

impl Hash256 {
    pub fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `previous_hash` of the genesis block.
    pub fn genesis_parent() -> Self {
        Self("0".to_string())
    }

    /// An output identity not yet assigned by block application.
    pub fn placeholder() -> Self {
        Self(String::new())
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 16 {
            write!(f, "Hash256({}…)", &self.0[..16])
        } else {
            write!(f, "Hash256({})", self.0)
        }
    }
}

impl From<&str> for Hash256 {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Address ──────────────────────────────────────────────────────────────────

/// A 64-character lowercase hex account address: SHA-256 of the raw
/// uncompressed public-key bytes. Opaque to the chain engine.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 8 {
            write!(f, "Address({}…)", &self.0[..8])
        } else {
            write!(f, "Address({})", self.0)
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── UtxoQuery ────────────────────────────────────────────────────────────────

/// Read-only view of the unspent output set, narrowed to what wallets need
/// when assembling transactions. Implemented by the chain engine and passed
/// explicitly so the wallet never holds a reference back into engine state.
pub trait UtxoQuery {
    /// Unspent outputs currently credited to `address`, in a deterministic
    /// order (wallets consume them first-fit).
    fn unspent_outputs(&self, address: &Address) -> Vec<crate::transaction::TxOutput>;
}

/// Current unix timestamp in seconds.
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}
