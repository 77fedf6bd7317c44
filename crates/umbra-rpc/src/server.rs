use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use umbra_core::block::Block;
use umbra_core::error::UmbraError;
use umbra_core::transaction::Transaction;
use umbra_core::types::{unix_now, Address};
use umbra_crypto::pow::mine_block;
use umbra_p2p::{NodeHandle, PeerMessage};
use umbra_wallet::{Wallet, WalletStore};

use crate::types::{
    MineRequest, RecoverWalletRequest, RpcBalance, RpcChainInfo, RpcMineStarted,
    RpcTransactionAccepted, RpcWallet, SubmitTransactionRequest,
};

// ── State / errors ───────────────────────────────────────────────────────────

/// Shared state behind every API handler.
#[derive(Clone)]
pub struct ApiState {
    pub node: NodeHandle,
    pub wallets: Arc<Mutex<WalletStore>>,
}

/// API failure: a status code and a message for the body.
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, msg.into())
    }

    fn internal(msg: impl Into<String>) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, msg.into())
    }
}

impl From<UmbraError> for ApiError {
    fn from(e: UmbraError) -> Self {
        if e.is_client_error() {
            Self::bad_request(e.to_string())
        } else {
            Self::internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the management API router. The caller merges in the `/ws` peer
/// endpoint and serves the result.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/chain", get(full_chain))
        .route("/chain/info", get(chain_info))
        .route("/balance/{address}", get(balance))
        .route("/wallets", post(create_wallet))
        .route("/wallets/recover", post(recover_wallet))
        .route("/transactions", post(submit_transaction))
        .route("/mine", post(trigger_mining))
        .layer(CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any))
        .with_state(state)
}

// ── Chain queries ────────────────────────────────────────────────────────────

async fn full_chain(State(state): State<ApiState>) -> Json<Vec<Block>> {
    let bc = state.node.chain.read().expect("engine lock poisoned");
    Json(bc.chain.clone())
}

async fn chain_info(State(state): State<ApiState>) -> Json<RpcChainInfo> {
    let bc = state.node.chain.read().expect("engine lock poisoned");
    Json(RpcChainInfo {
        blocks: bc.height(),
        total_supply: bc.total_supply(),
        pending_transactions: bc.pending.len(),
        difficulty: bc.difficulty,
        current_reward: bc.current_reward(),
        is_valid: bc.is_chain_valid(),
    })
}

async fn balance(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Json<RpcBalance> {
    let bc = state.node.chain.read().expect("engine lock poisoned");
    let balance = bc.balance(&Address::new(address.clone()));
    Json(RpcBalance { address, balance })
}

// ── Wallets ──────────────────────────────────────────────────────────────────

async fn create_wallet(State(state): State<ApiState>) -> Result<Json<RpcWallet>, ApiError> {
    let wallet = Wallet::generate().map_err(|e| ApiError::internal(e.to_string()))?;
    register_wallet(&state, &wallet)?;
    info!(address = %wallet.address(), "wallet created");
    Ok(Json(RpcWallet {
        address: wallet.address().to_string(),
        public_key: wallet.public_key_hex(),
        private_key: wallet.private_key_hex(),
        seed_phrase: wallet.seed_phrase().map(str::to_string),
    }))
}

async fn recover_wallet(
    State(state): State<ApiState>,
    Json(req): Json<RecoverWalletRequest>,
) -> Result<Json<RpcWallet>, ApiError> {
    let wallet = Wallet::from_private_key(&req.private_key)
        .map_err(|_| ApiError::bad_request("invalid private key"))?;
    register_wallet(&state, &wallet)?;
    info!(address = %wallet.address(), "wallet recovered");
    Ok(Json(RpcWallet {
        address: wallet.address().to_string(),
        public_key: wallet.public_key_hex(),
        private_key: wallet.private_key_hex(),
        seed_phrase: None,
    }))
}

/// Make the wallet visible to ring verification and persist it.
fn register_wallet(state: &ApiState, wallet: &Wallet) -> Result<(), ApiError> {
    state
        .node
        .directory
        .write()
        .expect("directory lock poisoned")
        .register(&wallet.public_key_hex())?;
    state
        .wallets
        .lock()
        .expect("wallet store lock poisoned")
        .insert(wallet)?;
    Ok(())
}

// ── Transactions / mining ────────────────────────────────────────────────────

async fn submit_transaction(
    State(state): State<ApiState>,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<Json<RpcTransactionAccepted>, ApiError> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(ApiError::bad_request("amount must be a positive number"));
    }
    let wallet = Wallet::from_private_key(&req.private_key)
        .map_err(|_| ApiError::bad_request("invalid private key"))?;
    let receiver = Address::new(req.receiver_address);

    let (tx, txid) = {
        let directory = state.node.directory.read().expect("directory lock poisoned");
        let mut bc = state.node.chain.write().expect("engine lock poisoned");
        let tx = if req.anonymous {
            wallet.create_anonymous_transaction(
                &*bc,
                &directory,
                receiver,
                req.amount,
                req.metadata,
            )?
        } else {
            let mut tx = Transaction::standard(receiver, req.amount, req.metadata, unix_now());
            wallet.sign_transaction(&mut tx);
            tx
        };
        let txid = bc.add_transaction(tx.clone(), &directory)?;
        state.node.persist(&bc);
        (tx, txid)
    };

    state.node.hub.broadcast(&PeerMessage::NewTransaction { transaction: tx }, None);
    Ok(Json(RpcTransactionAccepted {
        txid: txid.to_string(),
        tx_type: if req.anonymous { "anonymous" } else { "standard" }.to_string(),
    }))
}

/// Kick off block production and return immediately; the block is applied,
/// persisted and gossiped when the worker finishes. The candidate is built
/// under a short read lock and the nonce search runs unlocked, so gossip
/// and queries proceed while mining; the write lock is taken only to
/// commit. Mining is not preempted by arriving blocks — a result mined
/// against a tip that advanced in the meantime fails the parent check and
/// is discarded.
async fn trigger_mining(
    State(state): State<ApiState>,
    Json(req): Json<MineRequest>,
) -> Result<Json<RpcMineStarted>, ApiError> {
    if req.miner_address.is_empty() {
        return Err(ApiError::bad_request("miner_address must not be empty"));
    }
    let node = state.node.clone();
    let miner = Address::new(req.miner_address.clone());
    let manifest = req.manifest;

    tokio::task::spawn_blocking(move || {
        let (mut block, difficulty) = {
            let bc = node.chain.read().expect("engine lock poisoned");
            (bc.build_candidate(&miner, manifest), bc.difficulty)
        };
        mine_block(&mut block, difficulty);

        let mined = {
            let mut bc = node.chain.write().expect("engine lock poisoned");
            match bc.try_append_block(block) {
                Ok(()) => {
                    node.persist(&bc);
                    Some(bc.latest_block().clone())
                }
                Err(e) => {
                    warn!(error = %e, "mined block discarded");
                    None
                }
            }
        };
        if let Some(block) = mined {
            node.hub.broadcast(&PeerMessage::NewBlock { block }, None);
        }
    });

    Ok(Json(RpcMineStarted { status: "mining".to_string(), miner_address: req.miner_address }))
}
