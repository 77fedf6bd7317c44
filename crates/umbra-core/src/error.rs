use thiserror::Error;

#[derive(Debug, Error)]
pub enum UmbraError {
    // ── Transaction errors ───────────────────────────────────────────────────
    #[error("invalid signature")]
    InvalidSignature,

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: f64, have: f64 },

    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(&'static str),

    // ── UTXO / key-image errors ──────────────────────────────────────────────
    #[error("unknown outpoint: {txid}:{index}")]
    UnknownOutpoint { txid: String, index: u32 },

    #[error("key image already spent: {0}")]
    DoubleSpendKeyImage(String),

    #[error("referenced output {txid}:{index} does not belong to the sender")]
    ForeignOutpoint { txid: String, index: u32 },

    // ── Block / chain errors ─────────────────────────────────────────────────
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("peer chain not strictly longer: ours {ours}, theirs {theirs}")]
    ChainTooShort { ours: usize, theirs: usize },

    // ── Peer protocol ────────────────────────────────────────────────────────
    #[error("peer protocol violation: {0}")]
    PeerProtocol(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── Crypto ───────────────────────────────────────────────────────────────
    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl UmbraError {
    /// Whether this error is caller-caused (rejected input) rather than an
    /// engine or storage failure. Drives the HTTP 400/500 split.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            UmbraError::Storage(_) | UmbraError::Serialization(_) | UmbraError::Crypto(_)
        )
    }
}

impl From<serde_json::Error> for UmbraError {
    fn from(e: serde_json::Error) -> Self {
        UmbraError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for UmbraError {
    fn from(e: std::io::Error) -> Self {
        UmbraError::Storage(e.to_string())
    }
}

impl From<hex::FromHexError> for UmbraError {
    fn from(e: hex::FromHexError) -> Self {
        UmbraError::Crypto(e.to_string())
    }
}
