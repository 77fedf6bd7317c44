use serde::{Deserialize, Serialize};

/// Chain summary returned by `GET /chain/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcChainInfo {
    pub blocks: usize,
    pub total_supply: f64,
    pub pending_transactions: usize,
    pub difficulty: usize,
    pub current_reward: f64,
    pub is_valid: bool,
}

/// Wallet material returned on create/recover. The private key and seed
/// phrase appear exactly once, in this response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcWallet {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
    pub seed_phrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBalance {
    pub address: String,
    pub balance: f64,
}

/// Body of `POST /wallets/recover`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoverWalletRequest {
    pub private_key: String,
}

/// Body of `POST /transactions`: the node signs and submits on behalf of
/// the supplied key, transparently or anonymously.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTransactionRequest {
    pub private_key: String,
    pub receiver_address: String,
    pub amount: f64,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTransactionAccepted {
    pub txid: String,
    pub tx_type: String,
}

/// Body of `POST /mine`.
#[derive(Debug, Clone, Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
    #[serde(default)]
    pub manifest: Option<String>,
}

/// Returned immediately; the block itself is gossiped once mined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMineStarted {
    pub status: String,
    pub miner_address: String,
}
